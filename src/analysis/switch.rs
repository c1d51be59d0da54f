//! Jump-table recovery.
//!
//! Compilers lower a dense `switch` into:
//!
//! ```text
//!         cmp.w   #nn, Rx
//!         jc      default
//!         [mov.w  Rx, Ry]
//!         rla.w   Ry
//!         br      jtbl(Ry)
//! jtbl    .short  case0, case1, ...
//! ```
//!
//! The matcher starts at the branch and walks back at most four
//! instructions. Any mismatch abandons the attempt without side effects.

use super::{is_branch, AnalysisHost, InstructionHistory};
use crate::opcode::Opcode;
use crate::types::{DataWidth, Instruction, OperandKind, Register, Suffix, SwitchInfo};
use tracing::debug;

/// `add.w Ry, Ry` or `rla.w Ry`.
fn is_index_scale(insn: &Instruction, ry: Register) -> bool {
    if insn.suffix != Suffix::Word {
        return false;
    }
    match insn.opcode {
        Opcode::Add => insn.op1.is_reg(ry) && insn.op2.is_reg(ry),
        Opcode::Rla => insn.op1.is_reg(ry),
        _ => false,
    }
}

/// Source register of `mov.w Rx, Ry`.
fn index_copy_source(insn: &Instruction, ry: Register) -> Option<Register> {
    if insn.opcode != Opcode::Mov || insn.suffix != Suffix::Word || !insn.op2.is_reg(ry) {
        return None;
    }
    match insn.op1.kind {
        OperandKind::Reg(rx) => Some(rx),
        _ => None,
    }
}

/// Match the switch idiom ending at the branch `insn`.
pub fn detect_switch<H: InstructionHistory + ?Sized>(
    insn: &Instruction,
    history: &H,
) -> Option<SwitchInfo> {
    if !is_branch(insn) {
        return None;
    }
    let OperandKind::Displ { reg: ry, disp: jumps } = insn.op1.kind else {
        return None;
    };

    let scale = history.previous(insn.address)?;
    if !is_index_scale(&scale, ry) {
        return None;
    }

    let mut prev = history.previous(scale.address)?;
    let rx = match index_copy_source(&prev, ry) {
        Some(rx) => {
            prev = history.previous(prev.address)?;
            rx
        }
        None => ry,
    };

    if prev.opcode != Opcode::Jc {
        return None;
    }
    let OperandKind::Near(default_target) = prev.op1.kind else {
        return None;
    };

    let cmp = history.previous(prev.address)?;
    if cmp.opcode != Opcode::Cmp || cmp.suffix != Suffix::Word || !cmp.op2.is_reg(rx) {
        return None;
    }
    let ncases = cmp.op1.imm()?;

    Some(SwitchInfo {
        jumps,
        default_target,
        ncases,
        lowcase: 0,
        index_register: rx,
        start: cmp.address,
        element_width: DataWidth::Word,
    })
}

/// Look for a switch at a non-flowing instruction and register it.
///
/// Returns `true` when a new switch was registered.
pub fn check_switch<H: AnalysisHost + ?Sized>(insn: &Instruction, host: &mut H) -> bool {
    if host.has_switch(insn.address) {
        return false;
    }
    let Some(info) = detect_switch(insn, host) else {
        return false;
    };
    debug!(
        address = insn.address,
        jumps = info.jumps,
        ncases = info.ncases,
        "switch detected"
    );
    host.mark_offset(insn.address, 0);
    host.register_switch(insn.address, info);
    true
}
