//! Operand resolution.
//!
//! Turns a (register, addressing mode, width) triple plus any words that
//! follow into a typed [`Operand`], including the constant-generator
//! encodings and the MSP430X 20-bit forms.

use super::{bit, bits, sign_extend};
use crate::error::Result;
use crate::reader::{Cursor, WordSource};
use crate::types::{DataWidth, MemMode, Operand, OperandKind, Register};

/// Addressing mode of one operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    /// `Rn`
    Register,
    /// `X(Rn)`, also symbolic and absolute.
    Indexed,
    /// `@Rn`
    Indirect,
    /// `@Rn+`, also immediate (`#N` = `@PC+`).
    Autoinc,
    /// Rn holds imm19:16, imm15:0 follows.
    Imm20,
    /// Rn holds abs19:16, abs15:0 follows.
    Abs20,
    /// As `Imm20`, plus the PC value.
    Sym20,
}

impl AddrMode {
    /// Mode from a 2-bit As/Ad field.
    pub fn from_field(field: u16) -> Self {
        match field & 3 {
            0 => AddrMode::Register,
            1 => AddrMode::Indexed,
            2 => AddrMode::Indirect,
            _ => AddrMode::Autoinc,
        }
    }
}

/// Width selected by the B/W bit.
pub(crate) fn width_from_bw(bw: u16) -> DataWidth {
    if bw == 0 {
        DataWidth::Word
    } else {
        DataWidth::Byte
    }
}

/// Apply the extension word's A/L bit: A/L=0 with B/W=1 is the 20-bit width.
pub(crate) fn upgrade_width(width: DataWidth, extw: Option<u16>) -> DataWidth {
    match extw {
        Some(extw) if bit(extw, 6) == 0 && width == DataWidth::Byte => DataWidth::AddressWord,
        _ => width,
    }
}

const CG_SR: [u32; 2] = [4, 8];
const CG_R3: [u32; 4] = [0, 1, 2, u32::MAX];

/// Build one operand, fetching its extension word if the mode needs one.
///
/// `is_source` selects which nibble of the extension word supplies the top
/// address bits; `is_cg` enables the constant generators.
pub(crate) fn fill_op<S: WordSource + ?Sized>(
    cur: &mut Cursor<'_, S>,
    reg: u16,
    mode: AddrMode,
    width: DataWidth,
    is_source: bool,
    is_cg: bool,
    extw: Option<u16>,
) -> Result<Operand> {
    let register = Register::from_field(reg);
    let width = upgrade_width(width, extw);
    let topaddr = match extw {
        Some(extw) if is_source => u32::from(bits(extw, 10, 7)),
        Some(extw) => u32::from(bits(extw, 3, 0)),
        None => 0,
    };

    if is_cg {
        match (register, mode) {
            (Register::SR, AddrMode::Indirect) => {
                return Ok(Operand::new(OperandKind::Imm(CG_SR[0]), width))
            }
            (Register::SR, AddrMode::Autoinc) => {
                return Ok(Operand::new(OperandKind::Imm(CG_SR[1]), width))
            }
            (Register::R3, AddrMode::Register) => {
                return Ok(Operand::new(OperandKind::Imm(CG_R3[0]), width))
            }
            (Register::R3, AddrMode::Indexed) => {
                return Ok(Operand::new(OperandKind::Imm(CG_R3[1]), width))
            }
            (Register::R3, AddrMode::Indirect) => {
                return Ok(Operand::new(OperandKind::Imm(CG_R3[2]), width))
            }
            (Register::R3, AddrMode::Autoinc) => {
                return Ok(Operand::new(OperandKind::Imm(CG_R3[3]), width))
            }
            _ => {}
        }
    }

    let mut op = Operand::new(OperandKind::Void, width);
    match mode {
        AddrMode::Register => {
            op.kind = OperandKind::Reg(register);
            op.width = DataWidth::Word;
        }
        AddrMode::Indexed => {
            op.offb = cur.size();
            let pcval = cur.position();
            let raw = u32::from(cur.fetch()?) | (topaddr << 16);
            op.kind = match register {
                Register::SR => OperandKind::Mem {
                    addr: raw,
                    mode: MemMode::Absolute,
                },
                Register::PC => OperandKind::Mem {
                    addr: symbolic_address(raw, pcval, extw.is_some()),
                    mode: MemMode::Symbolic,
                },
                reg => OperandKind::Displ { reg, disp: raw },
            };
            // all addresses and indexes are 20-bit behind an extension word
            if extw.is_some() {
                op.width = DataWidth::AddressWord;
            }
        }
        AddrMode::Indirect => {
            op.kind = OperandKind::Indirect {
                reg: register,
                autoinc: false,
            };
        }
        AddrMode::Autoinc if register == Register::PC => {
            // @PC+ is an immediate
            op.width = if extw.is_some() {
                DataWidth::AddressWord
            } else {
                DataWidth::Word
            };
            op.offb = cur.size();
            op.kind = OperandKind::Imm(u32::from(cur.fetch()?) | (topaddr << 16));
        }
        AddrMode::Autoinc => {
            op.kind = OperandKind::Indirect {
                reg: register,
                autoinc: true,
            };
        }
        AddrMode::Imm20 | AddrMode::Abs20 | AddrMode::Sym20 => {
            op.offb = cur.size();
            let value = (u32::from(reg) << 16) | u32::from(cur.fetch()?);
            op.kind = match mode {
                AddrMode::Imm20 => {
                    op.width = DataWidth::AddressWord;
                    OperandKind::Imm(value)
                }
                AddrMode::Sym20 => OperandKind::Mem {
                    // no sign extension or wrapping here
                    addr: value.wrapping_add(cur.position()),
                    mode: MemMode::Symbolic,
                },
                _ => OperandKind::Mem {
                    addr: value,
                    mode: MemMode::Absolute,
                },
            };
        }
    }
    Ok(op)
}

/// Target of a PC-relative index.
///
/// `pcval` is the address of the index word. Without an extension word the
/// index is a signed 16-bit value and the result wraps to 64K while the PC
/// is below 64K; above 64K it is used as-is. Behind an extension word the
/// index is a signed 20-bit value and nothing wraps.
pub(crate) fn symbolic_address(raw: u32, pcval: u32, extended: bool) -> u32 {
    if extended {
        (sign_extend(raw, 20) + i64::from(pcval)) as u32
    } else {
        let addr = (sign_extend(raw, 16) + i64::from(pcval)) as u32;
        if pcval < 0x1_0000 {
            addr & 0xFFFF
        } else {
            addr
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Image;

    fn words(ws: &[u16]) -> Vec<u8> {
        ws.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn test_constant_generators() {
        let bytes = words(&[0]);
        let image = Image::new(0, &bytes);
        let cases = [
            (2, AddrMode::Indirect, 4),
            (2, AddrMode::Autoinc, 8),
            (3, AddrMode::Register, 0),
            (3, AddrMode::Indexed, 1),
            (3, AddrMode::Indirect, 2),
            (3, AddrMode::Autoinc, u32::MAX),
        ];
        for (reg, mode, value) in cases {
            let mut cur = Cursor::new(&image, 0);
            let op = fill_op(&mut cur, reg, mode, DataWidth::Word, true, true, None).unwrap();
            assert_eq!(op.kind, OperandKind::Imm(value), "reg {reg} mode {mode:?}");
            assert_eq!(cur.size(), 0);
        }
    }

    #[test]
    fn test_constant_generator_disabled() {
        let bytes = words(&[0]);
        let image = Image::new(0, &bytes);
        let mut cur = Cursor::new(&image, 0);
        let op = fill_op(&mut cur, 3, AddrMode::Register, DataWidth::Byte, false, false, None)
            .unwrap();
        assert_eq!(op.kind, OperandKind::Reg(Register::R3));
        assert_eq!(op.width, DataWidth::Word);
    }

    #[test]
    fn test_absolute_and_displacement() {
        let bytes = words(&[0x0200]);
        let image = Image::new(0x4400, &bytes);

        let mut cur = Cursor::new(&image, 0x4400);
        let op = fill_op(&mut cur, 2, AddrMode::Indexed, DataWidth::Word, true, true, None)
            .unwrap();
        assert_eq!(
            op.kind,
            OperandKind::Mem {
                addr: 0x0200,
                mode: MemMode::Absolute
            }
        );

        let mut cur = Cursor::new(&image, 0x4400);
        let op = fill_op(&mut cur, 5, AddrMode::Indexed, DataWidth::Byte, false, false, None)
            .unwrap();
        assert_eq!(
            op.kind,
            OperandKind::Displ {
                reg: Register::R5,
                disp: 0x0200
            }
        );
        assert_eq!(op.width, DataWidth::Byte);
        assert_eq!(cur.size(), 2);
    }

    #[test]
    fn test_symbolic_wraparound() {
        // below 64K the result wraps
        assert_eq!(symbolic_address(0x0010, 0xFFFE, false), 0x000E);
        assert_eq!(symbolic_address(0xFFFE, 0x0004, false), 0x0002);
        // at 64K and above it does not
        assert_eq!(symbolic_address(0x0010, 0x1_0000, false), 0x1_0010);
        assert_eq!(symbolic_address(0xFFF0, 0x1_0000, false), 0x0_FFF0);
        // 20-bit displacement never wraps
        assert_eq!(symbolic_address(0x0_0010, 0xFFFE, true), 0x1_000E);
        assert_eq!(symbolic_address(0xF_FFFE, 0x1_0000, true), 0x0_FFFE);
    }

    #[test]
    fn test_immediate_with_extension_word() {
        // extension word supplies src bits 19:16 in bits 10:7
        let extw = 0x1800 | (0x5 << 7);
        let bytes = words(&[extw, 0x0000, 0x1234]);
        let image = Image::new(0, &bytes);
        let mut cur = Cursor::new(&image, 0);
        cur.fetch().unwrap();
        cur.fetch().unwrap();
        let op = fill_op(&mut cur, 0, AddrMode::Autoinc, DataWidth::Word, true, true, Some(extw))
            .unwrap();
        assert_eq!(op.kind, OperandKind::Imm(0x5_1234));
        assert_eq!(op.width, DataWidth::AddressWord);
        assert_eq!(op.offb, 4);
    }

    #[test]
    fn test_width_upgrade() {
        assert_eq!(upgrade_width(DataWidth::Byte, Some(0x1800)), DataWidth::AddressWord);
        assert_eq!(upgrade_width(DataWidth::Byte, Some(0x1840)), DataWidth::Byte);
        assert_eq!(upgrade_width(DataWidth::Word, Some(0x1800)), DataWidth::Word);
        assert_eq!(upgrade_width(DataWidth::Byte, None), DataWidth::Byte);
    }

    #[test]
    fn test_20bit_forms() {
        let bytes = words(&[0x0000, 0x2345]);
        let image = Image::new(0x1_0000, &bytes);

        let mut cur = Cursor::new(&image, 0x1_0000);
        cur.fetch().unwrap();
        let op = fill_op(&mut cur, 1, AddrMode::Imm20, DataWidth::AddressWord, true, false, None)
            .unwrap();
        assert_eq!(op.kind, OperandKind::Imm(0x1_2345));

        let mut cur = Cursor::new(&image, 0x1_0000);
        cur.fetch().unwrap();
        let op = fill_op(&mut cur, 0, AddrMode::Sym20, DataWidth::AddressWord, true, false, None)
            .unwrap();
        assert_eq!(
            op.kind,
            OperandKind::Mem {
                addr: 0x2345 + 0x1_0004,
                mode: MemMode::Symbolic
            }
        );
    }

    #[test]
    fn test_missing_extension_word() {
        let bytes = words(&[0x4000]);
        let image = Image::new(0, &bytes);
        let mut cur = Cursor::new(&image, 0);
        cur.fetch().unwrap();
        assert!(fill_op(&mut cur, 5, AddrMode::Indexed, DataWidth::Word, true, true, None).is_err());
    }
}
