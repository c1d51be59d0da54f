//! Core types for the MSP430 analyzer.
//!
//! This module defines the registers, operands and instruction records
//! produced by the decoder, the descriptors produced by the flow analyzer,
//! and the option structures that configure analysis.

use crate::opcode::{Features, Opcode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// CPU registers.
///
/// R0..R3 have dedicated roles; R2 and R3 double as constant generators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Register {
    /// R0, program counter.
    PC = 0,
    /// R1, stack pointer.
    SP,
    /// R2, status register (constant generator 1).
    SR,
    /// Constant generator 2.
    R3,
    R4,
    R5,
    R6,
    R7,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
}

const REGISTERS: [Register; 16] = [
    Register::PC,
    Register::SP,
    Register::SR,
    Register::R3,
    Register::R4,
    Register::R5,
    Register::R6,
    Register::R7,
    Register::R8,
    Register::R9,
    Register::R10,
    Register::R11,
    Register::R12,
    Register::R13,
    Register::R14,
    Register::R15,
];

const REGISTER_NAMES: [&str; 16] = [
    "PC", "SP", "SR", "R3", "R4", "R5", "R6", "R7", "R8", "R9", "R10", "R11", "R12", "R13",
    "R14", "R15",
];

impl Register {
    /// Register from a 4-bit field; higher bits are ignored.
    pub fn from_field(n: u16) -> Self {
        REGISTERS[usize::from(n & 0xF)]
    }

    /// Register number 0..15.
    pub fn number(self) -> u8 {
        self as u8
    }

    /// Assembler name.
    pub fn name(self) -> &'static str {
        REGISTER_NAMES[self as usize]
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Width of the data an operand refers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataWidth {
    /// 8-bit byte.
    Byte,
    /// 16-bit word.
    #[default]
    Word,
    /// 20-bit address-word.
    AddressWord,
}

/// How a memory operand was addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemMode {
    /// `&addr`
    Absolute,
    /// `addr`, PC-relative in the encoding.
    Symbolic,
}

/// Operand shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperandKind {
    /// No operand.
    Void,
    /// `Rn`
    Reg(Register),
    /// `#value`; constant-generator -1 is stored as `u32::MAX`.
    Imm(u32),
    /// `@Rn` or `@Rn+`
    #[allow(missing_docs)]
    Indirect { reg: Register, autoinc: bool },
    /// `disp(Rn)`
    #[allow(missing_docs)]
    Displ { reg: Register, disp: u32 },
    /// `&addr` or symbolic `addr`
    #[allow(missing_docs)]
    Mem { addr: u32, mode: MemMode },
    /// Jump target.
    Near(u32),
}

/// One decoded operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operand {
    /// Operand shape and payload.
    pub kind: OperandKind,
    /// Width of the referenced data.
    pub width: DataWidth,
    /// Offset of the operand's extension word inside the encoding (0 if none).
    pub offb: u8,
}

impl Default for Operand {
    fn default() -> Self {
        Self::void()
    }
}

impl Operand {
    /// The empty operand.
    pub const fn void() -> Self {
        Self {
            kind: OperandKind::Void,
            width: DataWidth::Word,
            offb: 0,
        }
    }

    /// Operand of the given kind and width.
    pub fn new(kind: OperandKind, width: DataWidth) -> Self {
        Self {
            kind,
            width,
            offb: 0,
        }
    }

    /// True if there is no operand.
    pub fn is_void(&self) -> bool {
        matches!(self.kind, OperandKind::Void)
    }

    /// True if this is register `reg` in register mode.
    pub fn is_reg(&self, reg: Register) -> bool {
        self.kind == OperandKind::Reg(reg)
    }

    /// True if this is the immediate `value`.
    pub fn is_imm(&self, value: u32) -> bool {
        self.kind == OperandKind::Imm(value)
    }

    /// True if this is `@reg+`.
    pub fn is_autoinc(&self, reg: Register) -> bool {
        self.kind == OperandKind::Indirect { reg, autoinc: true }
    }

    /// Structural equality used by the emulated-mnemonic rules.
    ///
    /// Compares kind, register, value, address, mode and width but not the
    /// encoding offset, so `add 2(R5),2(R5)` still matches.
    pub fn same_as(&self, other: &Operand) -> bool {
        self.kind == other.kind && self.width == other.width
    }

    /// Register involved in the operand, if any.
    pub fn register(&self) -> Option<Register> {
        match self.kind {
            OperandKind::Reg(reg)
            | OperandKind::Indirect { reg, .. }
            | OperandKind::Displ { reg, .. } => Some(reg),
            _ => None,
        }
    }

    /// Immediate value, if this is an immediate.
    pub fn imm(&self) -> Option<u32> {
        match self.kind {
            OperandKind::Imm(value) => Some(value),
            _ => None,
        }
    }
}

/// Size suffix printed after the mnemonic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suffix {
    /// No suffix (e.g. `swpb`).
    #[default]
    None,
    /// `.w`
    Word,
    /// `.b`
    Byte,
    /// `.a`
    A,
    /// 20-bit immediate or address, no suffix printed.
    Ax,
}

impl Suffix {
    /// Suffix for a decoded data width.
    pub fn from_width(width: DataWidth) -> Self {
        match width {
            DataWidth::Word => Suffix::Word,
            DataWidth::Byte => Suffix::Byte,
            DataWidth::AddressWord => Suffix::A,
        }
    }

    /// Text appended to the mnemonic.
    pub fn as_str(self) -> &'static str {
        match self {
            Suffix::Word => ".w",
            Suffix::Byte => ".b",
            Suffix::A => ".a",
            Suffix::None | Suffix::Ax => "",
        }
    }

    /// True for the 20-bit forms.
    pub fn is_20bit(self) -> bool {
        matches!(self, Suffix::A | Suffix::Ax)
    }
}

/// Repeat modifier carried by a register-mode extension word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repeat {
    /// Execute once.
    #[default]
    None,
    /// `.rpt Rn`
    Register(Register),
    /// `.rpt #n`
    Count(u8),
}

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    /// Address of the first byte (the extension word, if present).
    pub address: u32,
    /// Instruction identity; `Null` when decoding failed.
    pub opcode: Opcode,
    /// First operand (source for two-operand forms).
    pub op1: Operand,
    /// Second operand (destination for two-operand forms).
    pub op2: Operand,
    /// Size suffix.
    pub suffix: Suffix,
    /// Repeat modifier.
    pub repeat: Repeat,
    /// Zero-carry modifier.
    pub zero_carry: bool,
    /// Encoded size in bytes; 0 for a null record.
    pub size: u8,
}

impl Instruction {
    /// Empty record at `address`.
    pub fn null(address: u32) -> Self {
        Self {
            address,
            opcode: Opcode::Null,
            op1: Operand::void(),
            op2: Operand::void(),
            suffix: Suffix::None,
            repeat: Repeat::None,
            zero_carry: false,
            size: 0,
        }
    }

    /// True if decoding failed.
    pub fn is_null(&self) -> bool {
        self.opcode.is_null() || self.size == 0
    }

    /// Address of the following instruction.
    pub fn end(&self) -> u32 {
        self.address.wrapping_add(u32::from(self.size))
    }

    /// Operand by index (0 or 1).
    pub fn operand(&self, n: usize) -> Option<&Operand> {
        match n {
            0 => Some(&self.op1),
            1 => Some(&self.op2),
            _ => None,
        }
    }

    /// Number of non-void operands.
    pub fn operand_count(&self) -> usize {
        [self.op1, self.op2].iter().filter(|op| !op.is_void()).count()
    }

    /// Canonical features of the opcode.
    pub fn features(&self) -> Features {
        self.opcode.features()
    }

    /// True if the instruction carries `.rpt` or `.zc` modifiers.
    pub fn has_modifiers(&self) -> bool {
        self.zero_carry || self.repeat != Repeat::None
    }
}

/// Kind of a code cross-reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeRef {
    /// Execution continues with the next instruction.
    Fallthrough,
    /// Jump or branch target.
    JumpTaken,
    /// Subroutine call target.
    CallTarget,
}

/// Kind of a data cross-reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataRef {
    /// The data is read.
    Read,
    /// The data is written.
    Write,
    /// An immediate holds the address.
    Offset,
}

/// Jump table recovered from a compiler switch idiom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SwitchInfo {
    /// Jump table base address.
    pub jumps: u32,
    /// Target of the out-of-range jump.
    pub default_target: u32,
    /// Number of table entries.
    pub ncases: u32,
    /// Value of the first case.
    pub lowcase: u32,
    /// Register holding the case index.
    pub index_register: Register,
    /// Address of the compare instruction that bounds the index.
    pub start: u32,
    /// Width of one table element.
    pub element_width: DataWidth,
}

/// Options for the flow & frame analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Emit stack-pointer deltas.
    pub trace_stack_pointer: bool,
    /// Create stack variables for `disp(SP)` operands.
    pub create_stack_vars: bool,
    /// Look for jump-table idioms on non-flowing instructions.
    pub check_switches: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            trace_stack_pointer: true,
            create_stack_vars: true,
            check_switches: true,
        }
    }

    /// Only cross-references; no frame or switch work.
    pub fn decode_only() -> Self {
        Self {
            trace_stack_pointer: false,
            create_stack_vars: false,
            check_switches: false,
        }
    }
}

/// Options for a linear sweep over a raw image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepOptions {
    /// Address of the first image byte.
    pub base: u32,
    /// Maximum number of bytes to disassemble.
    pub max_bytes: usize,
    /// Treat the whole image as a single function for stack tracing.
    pub single_function: bool,
    /// Analyzer settings.
    pub analysis: AnalysisOptions,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SweepOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            base: 0,
            max_bytes: 1024 * 1024, // 1MB
            single_function: true,
            analysis: AnalysisOptions::new(),
        }
    }

    /// Start at `base`.
    pub fn with_base(mut self, base: u32) -> Self {
        self.base = base;
        self
    }
}
