//! MSP430/MSP430X opcode table.
//!
//! Every mnemonic the decoder can produce is listed once below together
//! with its canonical feature flags and an auto-comment. The [`Opcode`]
//! enumeration and the lookup table are both generated from that list, so
//! dispatch is a plain enum-indexed array access.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Canonical feature flags of an instruction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Features: u8 {
        /// The first operand is read.
        const USE1 = 0x01;
        /// The second operand is read.
        const USE2 = 0x02;
        /// The first operand is modified.
        const CHG1 = 0x04;
        /// The second operand is modified.
        const CHG2 = 0x08;
        /// Subroutine call.
        const CALL = 0x10;
        /// Execution does not continue with the next instruction.
        const STOP = 0x20;
    }
}

const U1: u8 = Features::USE1.bits();
const U2: u8 = Features::USE2.bits();
const C1: u8 = Features::CHG1.bits();
const C2: u8 = Features::CHG2.bits();
const CALL: u8 = Features::CALL.bits();
const STOP: u8 = Features::STOP.bits();

/// Static description of one opcode.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeInfo {
    /// Assembler mnemonic (lowercase, without size suffix).
    pub name: &'static str,
    /// Canonical feature flags.
    pub features: Features,
    /// Short description used as an automatic comment.
    pub comment: &'static str,
}

macro_rules! opcodes {
    ($( $variant:ident => $name:literal, $features:expr, $comment:literal; )*) => {
        /// Instruction identity.
        ///
        /// `Null` is the "not an instruction" sentinel; every other variant
        /// is a hardware or emulated mnemonic.
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(rename_all = "lowercase")]
        #[repr(u8)]
        pub enum Opcode {
            /// Not an instruction.
            #[default]
            Null,
            $(
                #[doc = $comment]
                $variant,
            )*
        }

        static OPCODE_TABLE: &[OpcodeInfo] = &[
            OpcodeInfo { name: "", features: Features::empty(), comment: "" },
            $(
                OpcodeInfo {
                    name: $name,
                    features: Features::from_bits_retain($features),
                    comment: $comment,
                },
            )*
        ];

        impl Opcode {
            /// Every opcode, the null sentinel first.
            pub const ALL: &'static [Opcode] = &[Opcode::Null, $(Opcode::$variant,)*];
        }
    };
}

opcodes! {
    // two-operand instructions
    Mov   => "mov",   U1 | C2,      "Move source to destination";
    Add   => "add",   U1 | U2 | C2, "Add source to destination";
    Addc  => "addc",  U1 | U2 | C2, "Add source and carry to destination";
    Subc  => "subc",  U1 | U2 | C2, "Subtract source with carry from destination";
    Sub   => "sub",   U1 | U2 | C2, "Subtract source from destination";
    Cmp   => "cmp",   U1 | U2,      "Compare source and destination";
    Dadd  => "dadd",  U1 | U2 | C2, "Add source decimally to destination";
    Bit   => "bit",   U1 | U2,      "Test bits set in source in destination";
    Bic   => "bic",   U1 | U2 | C2, "Clear bits set in source in destination";
    Bis   => "bis",   U1 | U2 | C2, "Set bits set in source in destination";
    Xor   => "xor",   U1 | U2 | C2, "Exclusive OR source with destination";
    And   => "and",   U1 | U2 | C2, "Binary AND source and destination";

    // MSP430X two-operand instructions
    Movx  => "movx",  U1 | C2,      "Move source to destination";
    Addx  => "addx",  U1 | U2 | C2, "Add source to destination";
    Addcx => "addcx", U1 | U2 | C2, "Add source and carry to destination";
    Subcx => "subcx", U1 | U2 | C2, "Subtract source with carry from destination";
    Subx  => "subx",  U1 | U2 | C2, "Subtract source from destination";
    Cmpx  => "cmpx",  U1 | U2,      "Compare source and destination";
    Daddx => "daddx", U1 | U2 | C2, "Add source decimally to destination";
    Bitx  => "bitx",  U1 | U2,      "Test bits set in source in destination";
    Bicx  => "bicx",  U1 | U2 | C2, "Clear bits set in source in destination";
    Bisx  => "bisx",  U1 | U2 | C2, "Set bits set in source in destination";
    Xorx  => "xorx",  U1 | U2 | C2, "Exclusive OR source with destination";
    Andx  => "andx",  U1 | U2 | C2, "Binary AND source and destination";
    Rrcm  => "rrcm",  U1 | U2 | C2, "Rotate right through C";
    Rram  => "rram",  U1 | U2 | C2, "Rotate right arithmetically";
    Rlam  => "rlam",  U1 | U2 | C2, "Rotate left arithmetically";
    Rrum  => "rrum",  U1 | U2 | C2, "Rotate right unsigned";
    Pushm => "pushm", U1 | U2,      "Push registers onto stack";
    Popm  => "popm",  U1 | C2,      "Pop registers from the stack";

    // MSP430X address instructions
    Mova  => "mova",  U1 | C2,      "Move source to destination";
    Cmpa  => "cmpa",  U1 | U2,      "Compare source and destination";
    Adda  => "adda",  U1 | U2 | C2, "Add source to destination";
    Suba  => "suba",  U1 | U2 | C2, "Subtract source from destination";

    // one-operand instructions
    Rrc   => "rrc",   U1 | C1,      "Rotate right through C";
    Swpb  => "swpb",  U1 | C1,      "Swap bytes";
    Rra   => "rra",   U1 | C1,      "Rotate right arithmetically";
    Sxt   => "sxt",   U1 | C1,      "Extend sign (8 bits to 16)";
    Push  => "push",  U1,           "Push onto stack";
    Call  => "call",  U1 | CALL,    "Call subroutine";
    Reti  => "reti",  STOP,         "Return from interrupt";

    // MSP430X one-operand instructions
    Rrcx  => "rrcx",  U1 | C1,      "Rotate right through carry";
    Swpbx => "swpbx", U1 | C1,      "Exchange low byte with high byte";
    Rrax  => "rrax",  U1 | C1,      "Rotate right arithmetically";
    Sxtx  => "sxtx",  U1 | C1,      "Extend sign of lower byte";
    Pushx => "pushx", U1,           "Push onto stack";
    Calla => "calla", U1,           "Call subroutine (20-bit)";
    Rrux  => "rrux",  U1 | C1,      "Rotate right unsigned";

    // jumps
    Jnz   => "jnz",   U1,           "Jump if not zero/not equal";
    Jz    => "jz",    U1,           "Jump if zero/equal";
    Jnc   => "jnc",   U1,           "Jump if no carry/lower (unsigned)";
    Jc    => "jc",    U1,           "Jump if carry/higher or same (unsigned)";
    Jn    => "jn",    U1,           "Jump if negative";
    Jge   => "jge",   U1,           "Jump if greater or equal (signed)";
    Jl    => "jl",    U1,           "Jump if less (signed)";
    Jmp   => "jmp",   U1 | STOP,    "Jump unconditionally";

    // emulated instructions
    Adc   => "adc",   U1 | C1,      "Add carry to destination";
    Br    => "br",    U1 | STOP,    "Branch to destination";
    Clr   => "clr",   C1,           "Clear destination";
    Clrc  => "clrc",  0,            "Clear carry bit";
    Clrn  => "clrn",  0,            "Clear negative bit";
    Clrz  => "clrz",  0,            "Clear zero bit";
    Dadc  => "dadc",  U1 | C1,      "Add carry decimally to destination";
    Dec   => "dec",   U1 | C1,      "Decrement destination";
    Decd  => "decd",  U1 | C1,      "Double-decrement destination";
    Dint  => "dint",  0,            "Disable general interrupts";
    Eint  => "eint",  0,            "Enable general interrupts";
    Inc   => "inc",   U1 | C1,      "Increment destination";
    Incd  => "incd",  U1 | C1,      "Double-increment destination";
    Inv   => "inv",   U1 | C1,      "Invert destination";
    Nop   => "nop",   0,            "No operation";
    Pop   => "pop",   C1,           "Pop from the stack";
    Ret   => "ret",   STOP,         "Return from subroutine";
    Rla   => "rla",   U1 | C1,      "Rotate left arithmetically";
    Rlc   => "rlc",   U1 | C1,      "Rotate left through carry";
    Sbc   => "sbc",   U1 | C1,      "Subtract borrow (=NOT carry) from destination";
    Setc  => "setc",  0,            "Set carry bit";
    Setn  => "setn",  0,            "Set negative bit";
    Setz  => "setz",  0,            "Set zero bit";
    Tst   => "tst",   U1,           "Test destination";

    // MSP430X emulated instructions
    Adcx  => "adcx",  U1 | C1,      "Add carry to destination";
    Bra   => "bra",   U1 | STOP,    "Branch indirect to destination";
    Reta  => "reta",  STOP,         "Return from subroutine";
    Popa  => "popa",  C1,           "Pop from the stack";
    Clra  => "clra",  C1,           "Clear destination";
    Clrx  => "clrx",  C1,           "Clear destination";
    Dadcx => "dadcx", U1 | C1,      "Add carry decimally to destination";
    Decx  => "decx",  U1 | C1,      "Decrement destination";
    Decda => "decda", U1 | C1,      "Double-decrement destination";
    Decdx => "decdx", U1 | C1,      "Double-decrement destination";
    Incx  => "incx",  U1 | C1,      "Increment destination";
    Incda => "incda", U1 | C1,      "Double-increment destination";
    Incdx => "incdx", U1 | C1,      "Double-increment destination";
    Invx  => "invx",  U1 | C1,      "Invert destination";
    Rlax  => "rlax",  U1 | C1,      "Rotate left arithmetically";
    Rlcx  => "rlcx",  U1 | C1,      "Rotate left through carry";
    Sbcx  => "sbcx",  U1 | C1,      "Subtract borrow (=NOT carry) from destination";
    Tsta  => "tsta",  U1,           "Test destination";
    Tstx  => "tstx",  U1,           "Test destination";
    Popx  => "popx",  C1,           "Pop from the stack";
}

/// Format I opcodes indexed by `opcode field - 4`.
pub(crate) const FORMAT_I: [Opcode; 12] = [
    Opcode::Mov,
    Opcode::Add,
    Opcode::Addc,
    Opcode::Subc,
    Opcode::Sub,
    Opcode::Cmp,
    Opcode::Dadd,
    Opcode::Bit,
    Opcode::Bic,
    Opcode::Bis,
    Opcode::Xor,
    Opcode::And,
];

/// Format I opcodes behind an extension word.
pub(crate) const FORMAT_I_X: [Opcode; 12] = [
    Opcode::Movx,
    Opcode::Addx,
    Opcode::Addcx,
    Opcode::Subcx,
    Opcode::Subx,
    Opcode::Cmpx,
    Opcode::Daddx,
    Opcode::Bitx,
    Opcode::Bicx,
    Opcode::Bisx,
    Opcode::Xorx,
    Opcode::Andx,
];

/// Format II opcodes indexed by bits 9:7 (6 and 7 never reach this table).
pub(crate) const FORMAT_II: [Opcode; 6] = [
    Opcode::Rrc,
    Opcode::Swpb,
    Opcode::Rra,
    Opcode::Sxt,
    Opcode::Push,
    Opcode::Call,
];

/// Format II opcodes behind an extension word.
pub(crate) const FORMAT_II_X: [Opcode; 6] = [
    Opcode::Rrcx,
    Opcode::Swpbx,
    Opcode::Rrax,
    Opcode::Sxtx,
    Opcode::Pushx,
    Opcode::Calla,
];

/// Jump mnemonics indexed by the 3-bit condition code.
pub(crate) const JUMPS: [Opcode; 8] = [
    Opcode::Jnz,
    Opcode::Jz,
    Opcode::Jnc,
    Opcode::Jc,
    Opcode::Jn,
    Opcode::Jge,
    Opcode::Jl,
    Opcode::Jmp,
];

/// Multi-bit rotates indexed by Rsrc[1:0].
pub(crate) const ROTATE_M: [Opcode; 4] = [Opcode::Rrcm, Opcode::Rram, Opcode::Rlam, Opcode::Rrum];

impl Opcode {
    /// Static table entry for this opcode.
    pub fn info(self) -> &'static OpcodeInfo {
        &OPCODE_TABLE[self as usize]
    }

    /// Assembler mnemonic.
    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// Canonical feature flags.
    pub fn features(self) -> Features {
        self.info().features
    }

    /// Automatic comment text.
    pub fn comment(self) -> &'static str {
        self.info().comment
    }

    /// True for the "not an instruction" sentinel.
    pub fn is_null(self) -> bool {
        self == Opcode::Null
    }

    /// Look an opcode up by mnemonic.
    pub fn from_name(name: &str) -> Option<Opcode> {
        Opcode::ALL
            .iter()
            .copied()
            .find(|op| !op.is_null() && op.name().eq_ignore_ascii_case(name))
    }

    /// Opcodes printed without any size suffix after emulated rewriting.
    pub fn is_suffixless(self) -> bool {
        matches!(
            self,
            Opcode::Ret
                | Opcode::Reta
                | Opcode::Br
                | Opcode::Bra
                | Opcode::Clrc
                | Opcode::Clrn
                | Opcode::Clrz
                | Opcode::Dint
                | Opcode::Eint
                | Opcode::Nop
                | Opcode::Pop
                | Opcode::Popa
                | Opcode::Setc
                | Opcode::Setn
                | Opcode::Setz
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
