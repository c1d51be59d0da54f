//! MSP430 Analyzer - MSP430/MSP430X Instruction Decoding and Flow Analysis
//!
//! This library decodes MSP430 and MSP430X machine code into typed
//! instruction records and analyzes the result the way an interactive
//! disassembler does.
//!
//! # Features
//!
//! - **Complete Decoder**: Format I/II, jumps, extension words, MOVA/CALLA, PUSHM/POPM
//! - **Emulated Mnemonics**: `ret`, `pop`, `clr`, `inc`, `br`, ... instead of raw encodings
//! - **Flow Analysis**: Code/data cross-references, stack variables and jump tables
//! - **Stack Tracking**: Stack-pointer deltas for push/pop/arithmetic on SP
//! - **Host Independent**: Analysis results go through small collaborator traits
//!
//! # Quick Start
//!
//! ```rust
//! use msp430_analyzer::{decode, formatter::format_instruction, Opcode};
//!
//! // mov @SP+, PC
//! let insn = decode(&[0x30, 0x41], 0xC000)?;
//! assert_eq!(insn.opcode, Opcode::Ret);
//! assert_eq!(format_instruction(&insn), "ret");
//! # Ok::<(), msp430_analyzer::DecodeError>(())
//! ```
//!
//! # Analysis
//!
//! [`sweep::sweep`] decodes a whole image, feeds every instruction through
//! the [`analysis::Analyzer`] and returns a [`sweep::Listing`] whose
//! [`database::Database`] holds the cross-references, stack points and
//! switches. Hosts with their own database implement the traits in
//! [`analysis`] instead.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

pub mod analysis;
pub mod canon;
pub mod database;
pub mod decoder;
pub mod error;
pub mod formatter;
pub mod opcode;
pub mod reader;
pub mod sweep;
pub mod types;

pub use analysis::Analyzer;
pub use database::Database;
pub use decoder::Decoder;
pub use error::{DecodeError, Result};
pub use opcode::{Features, Opcode};
pub use reader::{Image, WordSource};
pub use sweep::Listing;
pub use types::{
    AnalysisOptions, CodeRef, DataRef, DataWidth, Instruction, MemMode, Operand, OperandKind,
    Register, Repeat, Suffix, SweepOptions, SwitchInfo,
};

use std::path::Path;

/// Decode one instruction from `bytes` loaded at `address`.
///
/// The first byte of `bytes` is the instruction start.
///
/// # Example
///
/// ```rust
/// use msp430_analyzer::{decode, Opcode, OperandKind, Register};
///
/// // add #1, R5
/// let insn = decode(&[0x15, 0x53], 0x4400)?;
/// assert_eq!(insn.opcode, Opcode::Inc);
/// assert_eq!(insn.op1.kind, OperandKind::Reg(Register::R5));
/// # Ok::<(), msp430_analyzer::DecodeError>(())
/// ```
pub fn decode(bytes: &[u8], address: u32) -> Result<Instruction> {
    Decoder::new().decode(&Image::new(address, bytes), address)
}

/// Disassemble and analyze a raw image loaded at `base`.
pub fn disassemble(bytes: &[u8], base: u32) -> Listing {
    sweep::sweep(bytes, &SweepOptions::new().with_base(base))
}

/// Disassemble a raw image file.
///
/// # Example
///
/// ```rust,no_run
/// use msp430_analyzer::{disassemble_file, SweepOptions};
///
/// let listing = disassemble_file("firmware.bin", &SweepOptions::new().with_base(0xC000))?;
/// println!("{} instructions", listing.instruction_count());
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn disassemble_file<P: AsRef<Path>>(path: P, options: &SweepOptions) -> std::io::Result<Listing> {
    sweep::disassemble_file(path, options)
}

/// Get version information for this library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let v = version();
        assert!(!v.is_empty());
    }

    #[test]
    fn test_decode_inc() {
        let insn = decode(&[0x15, 0x53], 0x4400).unwrap();
        assert_eq!(insn.opcode, Opcode::Inc);
        assert_eq!(insn.operand_count(), 1);
        assert_eq!(insn.op1.kind, OperandKind::Reg(Register::R5));
    }

    #[test]
    fn test_mov_zero_to_pc() {
        // mov #0, PC: constant generator source, branch to 0
        let insn = decode(&[0x00, 0x43], 0x4400).unwrap();
        assert_eq!(insn.opcode, Opcode::Clr);
        assert_eq!(insn.op1.kind, OperandKind::Reg(Register::PC));
    }

    #[test]
    fn test_symbolic_boundaries() {
        // mov 0x0010(PC), R5 with the index word at 0xFFFE wraps
        let bytes = [0x15, 0x40, 0x10, 0x00];
        let insn = decode(&bytes, 0xFFFC).unwrap();
        assert_eq!(
            insn.op1.kind,
            OperandKind::Mem {
                addr: 0x000E,
                mode: MemMode::Symbolic
            }
        );

        // with the index word at 0x10000 it does not
        let insn = decode(&bytes, 0xFFFE).unwrap();
        assert_eq!(
            insn.op1.kind,
            OperandKind::Mem {
                addr: 0x1_0010,
                mode: MemMode::Symbolic
            }
        );
    }

    #[test]
    fn test_disassemble() {
        let listing = disassemble(&[0x03, 0x43, 0x30, 0x41], 0xC000);
        assert_eq!(listing.instruction_count(), 2);
        assert!(listing.problems.is_empty());
    }
}
