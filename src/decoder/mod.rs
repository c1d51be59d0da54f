//! MSP430/MSP430X instruction decoder.
//!
//! Decoding peels an optional extension word, classifies the main word into
//! one of five formats, resolves the operands and finally rewrites the
//! result into its emulated mnemonic (see [`crate::canon`]).
//!
//! # Formats
//!
//! ```text
//!  Format I (double operand)
//!   15 ... 12 11 ... 8   7    6   5  4 3    0
//!  +---------+--------+----+-----+----+------+
//!  | Op-code |  Rsrc  | Ad | B/W | As | Rdst |
//!  +---------+--------+----+-----+----+------+
//!
//!  Format II (single operand)
//!   15         10 9       7   6   5  4 3    0
//!  +-------------+---------+-----+----+------+
//!  | 0 0 0 1 0 0 | Op-code | B/W | Ad | Rdst |
//!  +-------------+---------+-----+----+------+
//!
//!  Jump
//!   15     13 12   10 9                    0
//!  +---------+-------+----------------------+
//!  |  0 0 1  |   C   |  10-bit PC offset    |
//!  +---------+-------+----------------------+
//!
//!  Register mode extension word
//!   15 ... 12 11  10 9   8   7    6   5    4   3  0
//!  +---------+--------+----+---+-----+---+---+------+
//!  |  0001   | 1 | 00 | ZC | # | A/L | 0 | 0 | R/n-1|
//!  +---------+--------+----+---+-----+---+---+------+
//! ```

pub mod operand;

use crate::canon;
use crate::error::{DecodeError, Result};
use crate::opcode::{Opcode, FORMAT_I, FORMAT_II, FORMAT_II_X, FORMAT_I_X, JUMPS, ROTATE_M};
use crate::reader::{Cursor, WordSource};
use crate::types::{DataWidth, Instruction, Operand, OperandKind, Register, Repeat, Suffix};
use operand::{fill_op, upgrade_width, width_from_bw, AddrMode};
use tracing::trace;

/// Extract bits `high..=low` of `val`.
pub(crate) fn bits(val: u16, high: u32, low: u32) -> u16 {
    (val >> low) & ((1 << (high - low + 1)) - 1)
}

/// Extract one bit.
pub(crate) fn bit(val: u16, n: u32) -> u16 {
    (val >> n) & 1
}

/// Sign-extend the low `b` bits of `x`.
pub(crate) fn sign_extend(x: u32, b: u32) -> i64 {
    let m = 1i64 << (b - 1);
    let x = i64::from(x) & ((1i64 << b) - 1);
    (x ^ m) - m
}

/// True if `word` is an MSP430X extension word (top bits `00011`).
pub fn is_extension_word(word: u16) -> bool {
    bits(word, 15, 11) == 0b00011
}

/// False for the all-zero and all-one words (erased flash, padding), which
/// decode but are almost never real code.
pub fn is_sane(word: u16) -> bool {
    word != 0 && word != 0xFFFF
}

/// Instruction format selected by the top bits of the main word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Single operand, `000100` prefix; opcodes 6/7 are CALLA/RETI.
    Single,
    /// PUSHM/POPM, `000101` prefix.
    PushPop,
    /// Conditional and unconditional jumps, `001` prefix.
    Jump,
    /// MSP430X address instructions, `0000` prefix.
    Address,
    /// Double operand.
    Double,
}

impl Format {
    /// Classify a main (non-extension) word. The checks run in this order.
    pub fn classify(word: u16) -> Self {
        if bits(word, 15, 10) == 0b000100 {
            Format::Single
        } else if bits(word, 15, 10) == 0b000101 {
            Format::PushPop
        } else if bits(word, 15, 13) == 0b001 {
            Format::Jump
        } else if bits(word, 15, 12) == 0 {
            Format::Address
        } else {
            Format::Double
        }
    }
}

/// Instruction decoder.
///
/// The decoder is stateless; the same bytes at the same address always
/// produce the same record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoder {
    emulated: bool,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    /// Decoder producing emulated mnemonics (`ret`, `clr`, `inc`, ...).
    pub fn new() -> Self {
        Self { emulated: true }
    }

    /// Decoder producing only hardware mnemonics.
    pub fn canonical() -> Self {
        Self { emulated: false }
    }

    /// True if emulated mnemonics are produced.
    pub fn emulated(&self) -> bool {
        self.emulated
    }

    /// Decode the instruction at `address`.
    pub fn decode<S: WordSource + ?Sized>(&self, source: &S, address: u32) -> Result<Instruction> {
        if address & 1 != 0 {
            return Err(DecodeError::Misaligned { address });
        }
        let mut cur = Cursor::new(source, address);
        let mut insn = Instruction::null(address);

        let mut word = cur.fetch()?;
        let mut extw = None;
        if is_extension_word(word) {
            extw = Some(word);
            word = cur.fetch()?;
        }

        let format = Format::classify(word);
        let decoded = match (format, extw) {
            (Format::Single, _) => decode_format_ii(&mut cur, &mut insn, word, extw)?,
            (Format::PushPop | Format::Jump | Format::Address, Some(_)) => false,
            (Format::PushPop, None) => decode_pushm(&mut cur, &mut insn, word)?,
            (Format::Jump, None) => decode_jump(&mut insn, word),
            (Format::Address, None) => decode_address(&mut cur, &mut insn, word)?,
            (Format::Double, _) => decode_format_i(&mut cur, &mut insn, word, extw)?,
        };
        if !decoded || insn.opcode.is_null() {
            trace!(address, word, ?format, "rejected encoding");
            return Err(DecodeError::InvalidEncoding { address, word });
        }

        if self.emulated {
            canon::simplify(&mut insn);
        }
        insn.size = cur.size();
        Ok(insn)
    }

    /// Decode, folding any failure into the null record (size 0).
    pub fn decode_or_null<S: WordSource + ?Sized>(&self, source: &S, address: u32) -> Instruction {
        self.decode(source, address)
            .unwrap_or_else(|_| Instruction::null(address))
    }
}

/// Repeat and zero-carry modifiers of a register-mode extension word.
fn handle_reg_extw(insn: &mut Instruction, extw: u16) {
    let zc = bit(extw, 8);
    let repreg = bit(extw, 7);
    let rep = bits(extw, 3, 0);
    if rep != 0 {
        insn.repeat = if repreg != 0 {
            Repeat::Register(Register::from_field(rep))
        } else {
            Repeat::Count(rep as u8 + 1)
        };
    }
    if zc != 0 {
        if insn.opcode == Opcode::Rrcx {
            insn.opcode = Opcode::Rrux;
        } else {
            insn.zero_carry = true;
        }
    }
}

fn decode_format_i<S: WordSource + ?Sized>(
    cur: &mut Cursor<'_, S>,
    insn: &mut Instruction,
    w: u16,
    extw: Option<u16>,
) -> Result<bool> {
    let opc = bits(w, 15, 12);
    let src_mode = bits(w, 5, 4);
    let dst_mode = bit(w, 7);
    let rsrc = bits(w, 11, 8);
    let rdst = bits(w, 3, 0);
    let width = width_from_bw(bit(w, 6));
    if opc < 4 {
        return Ok(false);
    }
    let table = if extw.is_some() { &FORMAT_I_X } else { &FORMAT_I };
    insn.opcode = table[usize::from(opc - 4)];
    insn.op1 = fill_op(cur, rsrc, AddrMode::from_field(src_mode), width, true, true, extw)?;
    insn.op2 = fill_op(cur, rdst, AddrMode::from_field(dst_mode), width, false, false, extw)?;
    insn.suffix = Suffix::from_width(upgrade_width(width, extw));
    if let Some(extw) = extw {
        if src_mode == 0 && dst_mode == 0 {
            handle_reg_extw(insn, extw);
        }
    }
    Ok(true)
}

fn decode_format_ii<S: WordSource + ?Sized>(
    cur: &mut Cursor<'_, S>,
    insn: &mut Instruction,
    w: u16,
    extw: Option<u16>,
) -> Result<bool> {
    let opc = bits(w, 9, 7);
    let mode = bits(w, 5, 4);
    let rdst = bits(w, 3, 0);
    let bw = bit(w, 6);
    if opc >= 6 {
        if extw.is_some() {
            return Ok(false);
        }
        return decode_calla(cur, insn, w);
    }
    let width = width_from_bw(bw);
    let table = if extw.is_some() { &FORMAT_II_X } else { &FORMAT_II };
    insn.opcode = table[usize::from(opc)];
    insn.op1 = fill_op(cur, rdst, AddrMode::from_field(mode), width, false, true, extw)?;
    insn.suffix = Suffix::from_width(upgrade_width(width, extw));
    if matches!(insn.opcode, Opcode::Swpb | Opcode::Sxt | Opcode::Call) {
        // no size variants: B/W must be 0 and no suffix is printed
        if bw != 0 {
            return Ok(false);
        }
        insn.suffix = Suffix::None;
    }
    if let Some(extw) = extw {
        if mode == 0 {
            handle_reg_extw(insn, extw);
        }
    }
    Ok(true)
}

fn decode_jump(insn: &mut Instruction, w: u16) -> bool {
    let cond = bits(w, 12, 10);
    let offs = sign_extend(u32::from(bits(w, 9, 0)), 10);
    let target = (i64::from(insn.address) + 2 + offs * 2) as u32;
    insn.opcode = JUMPS[usize::from(cond)];
    insn.op1 = Operand::new(OperandKind::Near(target), DataWidth::Word);
    true
}

/// Address-instruction rows keyed by opcode bits 7:4; `None` marks the
/// RRCM/RRAM/RLAM/RRUM rows.
const ADDRESS_TABLE: [Option<(Opcode, AddrMode, AddrMode)>; 16] = [
    Some((Opcode::Mova, AddrMode::Indirect, AddrMode::Register)), // 0000 MOVA @Rsrc,Rdst
    Some((Opcode::Mova, AddrMode::Autoinc, AddrMode::Register)),  // 0001 MOVA @Rsrc+,Rdst
    Some((Opcode::Mova, AddrMode::Abs20, AddrMode::Register)),    // 0010 MOVA &abs20,Rdst
    Some((Opcode::Mova, AddrMode::Indexed, AddrMode::Register)),  // 0011 MOVA X(Rsrc),Rdst
    None,                                                         // 0100 Rxxx.A #n,Rdst
    None,                                                         // 0101 Rxxx.W #n,Rdst
    Some((Opcode::Mova, AddrMode::Register, AddrMode::Abs20)),    // 0110 MOVA Rsrc,&abs20
    Some((Opcode::Mova, AddrMode::Register, AddrMode::Indexed)),  // 0111 MOVA Rsrc,X(Rdst)
    Some((Opcode::Mova, AddrMode::Imm20, AddrMode::Register)),    // 1000 MOVA #imm20,Rdst
    Some((Opcode::Cmpa, AddrMode::Imm20, AddrMode::Register)),    // 1001 CMPA #imm20,Rdst
    Some((Opcode::Adda, AddrMode::Imm20, AddrMode::Register)),    // 1010 ADDA #imm20,Rdst
    Some((Opcode::Suba, AddrMode::Imm20, AddrMode::Register)),    // 1011 SUBA #imm20,Rdst
    Some((Opcode::Mova, AddrMode::Register, AddrMode::Register)), // 1100 MOVA Rsrc,Rdst
    Some((Opcode::Cmpa, AddrMode::Register, AddrMode::Register)), // 1101 CMPA Rsrc,Rdst
    Some((Opcode::Adda, AddrMode::Register, AddrMode::Register)), // 1110 ADDA Rsrc,Rdst
    Some((Opcode::Suba, AddrMode::Register, AddrMode::Register)), // 1111 SUBA Rsrc,Rdst
];

fn decode_address<S: WordSource + ?Sized>(
    cur: &mut Cursor<'_, S>,
    insn: &mut Instruction,
    w: u16,
) -> Result<bool> {
    let opc = bits(w, 7, 4);
    let rsrc = bits(w, 11, 8);
    let rdst = bits(w, 3, 0);
    match ADDRESS_TABLE[usize::from(opc)] {
        Some((opcode, src_mode, dst_mode)) => {
            insn.opcode = opcode;
            let cg = rdst != 0;
            insn.op1 = fill_op(cur, rsrc, src_mode, DataWidth::AddressWord, true, cg, None)?;
            insn.op2 = fill_op(cur, rdst, dst_mode, DataWidth::AddressWord, false, false, None)?;
            insn.suffix = Suffix::Ax;
        }
        None => {
            // Rsrc[3:2] is n-1, Rsrc[1:0] selects the rotate
            insn.opcode = ROTATE_M[usize::from(rsrc & 0b11)];
            insn.op1 = Operand::new(OperandKind::Imm(u32::from(rsrc >> 2) + 1), DataWidth::Byte);
            let is_word = opc & 1 != 0;
            let width = if is_word {
                DataWidth::Word
            } else {
                DataWidth::AddressWord
            };
            insn.op2 = fill_op(cur, rdst, AddrMode::Register, width, false, false, None)?;
            insn.suffix = if is_word { Suffix::Word } else { Suffix::A };
        }
    }
    Ok(true)
}

/// CALLA/RETI rows keyed by opcode bits 7:4.
const CALLA_TABLE: [(Opcode, Option<AddrMode>); 16] = [
    (Opcode::Reti, None),                        // 0000 RETI
    (Opcode::Null, None),                        // 0001
    (Opcode::Null, None),                        // 0010
    (Opcode::Null, None),                        // 0011
    (Opcode::Calla, Some(AddrMode::Register)),   // 0100 CALLA Rdst
    (Opcode::Calla, Some(AddrMode::Indexed)),    // 0101 CALLA X(Rdst)
    (Opcode::Calla, Some(AddrMode::Indirect)),   // 0110 CALLA @Rdst
    (Opcode::Calla, Some(AddrMode::Autoinc)),    // 0111 CALLA @Rdst+
    (Opcode::Calla, Some(AddrMode::Abs20)),      // 1000 CALLA &abs20
    (Opcode::Calla, Some(AddrMode::Sym20)),      // 1001 CALLA sym20
    (Opcode::Null, None),                        // 1010
    (Opcode::Calla, Some(AddrMode::Imm20)),      // 1011 CALLA #imm20
    (Opcode::Null, None),                        // 1100
    (Opcode::Null, None),                        // 1101
    (Opcode::Null, None),                        // 1110
    (Opcode::Null, None),                        // 1111
];

fn decode_calla<S: WordSource + ?Sized>(
    cur: &mut Cursor<'_, S>,
    insn: &mut Instruction,
    w: u16,
) -> Result<bool> {
    let opc = bits(w, 7, 4);
    let rdst = bits(w, 3, 0);
    let (opcode, mode) = CALLA_TABLE[usize::from(opc)];
    insn.opcode = opcode;
    if let Some(mode) = mode {
        insn.op1 = fill_op(cur, rdst, mode, DataWidth::AddressWord, true, false, None)?;
        insn.suffix = Suffix::Ax;
    }
    Ok(!opcode.is_null())
}

/// PUSHM/POPM:
///
/// ```text
///  15  10 98 7 4 3 0
///  000101 00 n-1 dst      PUSHM.A #n,Rdst
///  000101 01 n-1 dst      PUSHM.W #n,Rdst
///  000101 10 n-1 dst-n+1  POPM.A  #n,Rdst
///  000101 11 n-1 dst-n+1  POPM.W  #n,Rdst
/// ```
fn decode_pushm<S: WordSource + ?Sized>(
    cur: &mut Cursor<'_, S>,
    insn: &mut Instruction,
    w: u16,
) -> Result<bool> {
    let is_pop = bit(w, 9) != 0;
    let is_word = bit(w, 8) != 0;
    let n = bits(w, 7, 4) + 1;
    let mut rdst = bits(w, 3, 0);
    if is_pop {
        rdst += n - 1;
        if rdst > 15 {
            return Ok(false);
        }
    }
    insn.opcode = if is_pop { Opcode::Popm } else { Opcode::Pushm };
    insn.op1 = Operand::new(OperandKind::Imm(u32::from(n)), DataWidth::Byte);
    let width = if is_word {
        DataWidth::Word
    } else {
        DataWidth::AddressWord
    };
    insn.op2 = fill_op(cur, rdst, AddrMode::Register, width, false, false, None)?;
    insn.suffix = if is_word { Suffix::Word } else { Suffix::A };
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Image;
    use crate::types::MemMode;

    fn words(ws: &[u16]) -> Vec<u8> {
        ws.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    fn decode_at(address: u32, ws: &[u16]) -> Result<Instruction> {
        let bytes = words(ws);
        Decoder::new().decode(&Image::new(address, &bytes), address)
    }

    fn decode_raw(ws: &[u16]) -> Result<Instruction> {
        let bytes = words(ws);
        Decoder::canonical().decode(&Image::new(0xC000, &bytes), 0xC000)
    }

    fn reg(r: Register) -> OperandKind {
        OperandKind::Reg(r)
    }

    #[test]
    fn test_bit_helpers() {
        assert_eq!(bits(0x4130, 15, 12), 4);
        assert_eq!(bits(0x4130, 5, 4), 3);
        assert_eq!(bit(0x0040, 6), 1);
        assert_eq!(sign_extend(0x3FF, 10), -1);
        assert_eq!(sign_extend(0x1FF, 10), 511);
        assert_eq!(sign_extend(0x8000, 16), -32768);
        assert_eq!(sign_extend(0xF_FFFF, 20), -1);
    }

    #[test]
    fn test_classify() {
        assert_eq!(Format::classify(0x1285), Format::Single);
        assert_eq!(Format::classify(0x1500), Format::PushPop);
        assert_eq!(Format::classify(0x3C00), Format::Jump);
        assert_eq!(Format::classify(0x2402), Format::Jump);
        assert_eq!(Format::classify(0x0180), Format::Address);
        assert_eq!(Format::classify(0x4130), Format::Double);
        assert!(is_extension_word(0x1800));
        assert!(is_extension_word(0x1FFF));
        assert!(!is_extension_word(0x1300));
        assert!(!is_sane(0x0000));
        assert!(!is_sane(0xFFFF));
        assert!(is_sane(0x4130));
    }

    #[test]
    fn test_format_i_register() {
        // mov.w R5, R4
        let insn = decode_raw(&[0x4504]).unwrap();
        assert_eq!(insn.opcode, Opcode::Mov);
        assert_eq!(insn.op1.kind, reg(Register::R5));
        assert_eq!(insn.op2.kind, reg(Register::R4));
        assert_eq!(insn.suffix, Suffix::Word);
        assert_eq!(insn.size, 2);
    }

    #[test]
    fn test_format_i_opcode_field() {
        for opc in 4u16..=15 {
            let w = (opc << 12) | 0x0504;
            let insn = decode_raw(&[w]).unwrap();
            assert_eq!(insn.opcode, FORMAT_I[usize::from(opc - 4)]);
        }
    }

    fn mode_bits(op: &Operand) -> u16 {
        match op.kind {
            OperandKind::Reg(_) => 0,
            OperandKind::Displ { .. } => 1,
            OperandKind::Indirect { autoinc: false, .. } => 2,
            OperandKind::Indirect { autoinc: true, .. } => 3,
            ref other => panic!("unexpected operand {other:?}"),
        }
    }

    /// Rebuild the main word of a Format I instruction from its record.
    fn reencode(insn: &Instruction) -> u16 {
        let opc = FORMAT_I.iter().position(|&op| op == insn.opcode).unwrap() as u16 + 4;
        let rsrc = u16::from(insn.op1.register().unwrap().number());
        let rdst = u16::from(insn.op2.register().unwrap().number());
        let bw = u16::from(insn.suffix == Suffix::Byte);
        (opc << 12) | (rsrc << 8) | (mode_bits(&insn.op2) << 7) | (bw << 6)
            | (mode_bits(&insn.op1) << 4)
            | rdst
    }

    #[test]
    fn test_format_i_round_trip() {
        for opc in 4u16..=15 {
            for src_mode in 0u16..4 {
                for dst_mode in 0u16..2 {
                    for bw in 0u16..2 {
                        let w = (opc << 12) | (0x6 << 8) | (dst_mode << 7) | (bw << 6)
                            | (src_mode << 4)
                            | 0x9;
                        let insn = decode_raw(&[w, 0x0010, 0x0020]).unwrap();
                        assert_eq!(reencode(&insn), w, "{w:#06x}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_format_i_immediate_and_indexed() {
        // add.w #0x1234, 6(R5)
        let insn = decode_raw(&[0x50B5, 0x1234, 0x0006]).unwrap();
        assert_eq!(insn.opcode, Opcode::Add);
        assert_eq!(insn.op1.kind, OperandKind::Imm(0x1234));
        assert_eq!(insn.op1.offb, 2);
        assert_eq!(
            insn.op2.kind,
            OperandKind::Displ {
                reg: Register::R5,
                disp: 6
            }
        );
        assert_eq!(insn.op2.offb, 4);
        assert_eq!(insn.size, 6);
    }

    #[test]
    fn test_format_i_byte() {
        // mov.b &0x0021, R15
        let insn = decode_raw(&[0x425F, 0x0021]).unwrap();
        assert_eq!(insn.suffix, Suffix::Byte);
        assert_eq!(
            insn.op1.kind,
            OperandKind::Mem {
                addr: 0x21,
                mode: MemMode::Absolute
            }
        );
        assert_eq!(insn.op1.width, DataWidth::Byte);
        assert_eq!(insn.op2.kind, reg(Register::R15));
    }

    #[test]
    fn test_format_i_invalid_opcode() {
        // extension word followed by another extension word
        let err = decode_raw(&[0x1800, 0x1800]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::InvalidEncoding {
                address: 0xC000,
                word: 0x1800
            }
        );
    }

    #[test]
    fn test_extension_word_width() {
        // movx.a R5, R4: extension word with A/L=0, main word B/W=1
        let insn = decode_raw(&[0x1800, 0x4544]).unwrap();
        assert_eq!(insn.opcode, Opcode::Movx);
        assert_eq!(insn.suffix, Suffix::A);
        assert_eq!(insn.size, 4);

        // extension word with A/L=1 keeps the byte width
        let insn = decode_raw(&[0x1840, 0x4544]).unwrap();
        assert_eq!(insn.suffix, Suffix::Byte);
    }

    #[test]
    fn test_extension_word_indexed_width() {
        // movx.a 2(R5), R4
        let insn = decode_raw(&[0x1800, 0x4554, 0x0002]).unwrap();
        assert_eq!(insn.op1.width, DataWidth::AddressWord);
        assert_eq!(insn.op1.offb, 4);
        assert_eq!(insn.size, 6);
    }

    #[test]
    fn test_repeat_modifiers() {
        // .rpt #4 rrcx.w R5 -> extension word n-1 = 3
        let insn = decode_raw(&[0x1843, 0x1005]).unwrap();
        assert_eq!(insn.opcode, Opcode::Rrcx);
        assert_eq!(insn.repeat, Repeat::Count(4));
        assert!(!insn.zero_carry);

        // .rpt R7 addx.w R4, R5
        let insn = decode_raw(&[0x18C7, 0x5405]).unwrap();
        assert_eq!(insn.opcode, Opcode::Addx);
        assert_eq!(insn.repeat, Repeat::Register(Register::R7));

        // ZC on rrcx turns into rrux
        let insn = decode_raw(&[0x1940, 0x1005]).unwrap();
        assert_eq!(insn.opcode, Opcode::Rrux);
        assert!(!insn.zero_carry);

        // ZC elsewhere is kept as a modifier
        let insn = decode_raw(&[0x1940, 0x5405]).unwrap();
        assert!(insn.zero_carry);
    }

    #[test]
    fn test_format_ii() {
        // push.w R11
        let insn = decode_raw(&[0x120B]).unwrap();
        assert_eq!(insn.opcode, Opcode::Push);
        assert_eq!(insn.op1.kind, reg(Register::R11));
        assert_eq!(insn.suffix, Suffix::Word);

        // swpb R5 has no suffix
        let insn = decode_raw(&[0x1085]).unwrap();
        assert_eq!(insn.opcode, Opcode::Swpb);
        assert_eq!(insn.suffix, Suffix::None);

        // swpb.b is not an instruction
        assert!(decode_raw(&[0x10C5]).is_err());

        // call #0xC100
        let insn = decode_raw(&[0x12B0, 0xC100]).unwrap();
        assert_eq!(insn.opcode, Opcode::Call);
        assert_eq!(insn.op1.kind, OperandKind::Imm(0xC100));
        assert_eq!(insn.size, 4);

        // push #8 uses the constant generator
        let insn = decode_raw(&[0x1232]).unwrap();
        assert_eq!(insn.op1.kind, OperandKind::Imm(8));
        assert_eq!(insn.size, 2);
    }

    #[test]
    fn test_reti_and_calla() {
        let insn = decode_raw(&[0x1300]).unwrap();
        assert_eq!(insn.opcode, Opcode::Reti);
        assert_eq!(insn.operand_count(), 0);
        assert_eq!(insn.suffix, Suffix::None);

        // calla R5
        let insn = decode_raw(&[0x1345]).unwrap();
        assert_eq!(insn.opcode, Opcode::Calla);
        assert_eq!(insn.op1.kind, reg(Register::R5));
        assert_eq!(insn.suffix, Suffix::Ax);

        // calla #0x12345
        let insn = decode_raw(&[0x13B1, 0x2345]).unwrap();
        assert_eq!(insn.op1.kind, OperandKind::Imm(0x1_2345));
        assert_eq!(insn.size, 4);

        // calla &0x12345
        let insn = decode_raw(&[0x1381, 0x2345]).unwrap();
        assert_eq!(
            insn.op1.kind,
            OperandKind::Mem {
                addr: 0x1_2345,
                mode: MemMode::Absolute
            }
        );

        // undefined row
        assert!(decode_raw(&[0x1310]).is_err());
        // no extension word allowed
        assert!(decode_raw(&[0x1800, 0x1345]).is_err());
    }

    #[test]
    fn test_pushm_popm() {
        // pushm.w #4, R11
        let insn = decode_raw(&[0x153B]).unwrap();
        assert_eq!(insn.opcode, Opcode::Pushm);
        assert_eq!(insn.op1.kind, OperandKind::Imm(4));
        assert_eq!(insn.op2.kind, reg(Register::R11));
        assert_eq!(insn.suffix, Suffix::Word);

        // popm.w #4, R11 encodes R8 as the first register
        let insn = decode_raw(&[0x1738]).unwrap();
        assert_eq!(insn.opcode, Opcode::Popm);
        assert_eq!(insn.op2.kind, reg(Register::R11));

        // popm.a #2, R5
        let insn = decode_raw(&[0x1614]).unwrap();
        assert_eq!(insn.suffix, Suffix::A);
        assert_eq!(insn.op2.kind, reg(Register::R5));

        // register out of range
        assert!(decode_raw(&[0x17FF]).is_err());
        // no extension word allowed
        assert!(decode_raw(&[0x1800, 0x153B]).is_err());
    }

    #[test]
    fn test_jump_targets() {
        for cond in 0u16..8 {
            for disp in [0u16, 1, 0x1FF, 0x200, 0x3FF] {
                let w = 0x2000 | (cond << 10) | disp;
                let insn = decode_at(0x1000, &[w]).unwrap();
                assert_eq!(insn.opcode, JUMPS[usize::from(cond)]);
                let expected = (0x1002 + 2 * sign_extend(u32::from(disp), 10)) as u32;
                assert_eq!(insn.op1.kind, OperandKind::Near(expected));
                assert_eq!(insn.suffix, Suffix::None);
            }
        }
        assert!(decode_raw(&[0x1800, 0x3C00]).is_err());
    }

    #[test]
    fn test_address_instructions() {
        // mova @R5, R6
        let insn = decode_raw(&[0x0506]).unwrap();
        assert_eq!(insn.opcode, Opcode::Mova);
        assert_eq!(
            insn.op1.kind,
            OperandKind::Indirect {
                reg: Register::R5,
                autoinc: false
            }
        );
        assert_eq!(insn.suffix, Suffix::Ax);

        // adda #0x10000, R12
        let insn = decode_raw(&[0x01AC, 0x0000]).unwrap();
        assert_eq!(insn.opcode, Opcode::Adda);
        assert_eq!(insn.op1.kind, OperandKind::Imm(0x1_0000));
        assert_eq!(insn.size, 4);

        // mova R12, &0x2345
        let insn = decode_raw(&[0x0C60, 0x2345]).unwrap();
        assert_eq!(
            insn.op2.kind,
            OperandKind::Mem {
                addr: 0x2345,
                mode: MemMode::Absolute
            }
        );

        // rlam.w #3, R10
        let insn = decode_raw(&[0x0A5A]).unwrap();
        assert_eq!(insn.opcode, Opcode::Rlam);
        assert_eq!(insn.op1.kind, OperandKind::Imm(3));
        assert_eq!(insn.suffix, Suffix::Word);

        // rrcm.a #1, R10
        let insn = decode_raw(&[0x004A]).unwrap();
        assert_eq!(insn.opcode, Opcode::Rrcm);
        assert_eq!(insn.suffix, Suffix::A);
        assert!(decode_raw(&[0x1800, 0x0506]).is_err());
    }

    #[test]
    fn test_truncated_and_misaligned() {
        assert_eq!(
            decode_raw(&[0x40B5]).unwrap_err(),
            DecodeError::OutOfBounds { address: 0xC002 }
        );
        assert!(matches!(
            decode_raw(&[]).unwrap_err(),
            DecodeError::OutOfBounds { .. }
        ));
        let bytes = words(&[0x4303]);
        let image = Image::new(0xC001, &bytes);
        assert_eq!(
            Decoder::new().decode(&image, 0xC001).unwrap_err(),
            DecodeError::Misaligned { address: 0xC001 }
        );
    }

    #[test]
    fn test_decode_or_null() {
        let bytes = words(&[0x1310]);
        let image = Image::new(0, &bytes);
        let insn = Decoder::new().decode_or_null(&image, 0);
        assert!(insn.is_null());
        assert_eq!(insn.size, 0);
    }

    #[test]
    fn test_deterministic() {
        let bytes = words(&[0x40B2, 0x5A80, 0x0120]);
        let image = Image::new(0xC000, &bytes);
        let decoder = Decoder::new();
        assert_eq!(decoder.decode(&image, 0xC000), decoder.decode(&image, 0xC000));
    }
}
