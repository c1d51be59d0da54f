//! Stack-pointer tracking.

use super::AnalysisHost;
use crate::decoder::sign_extend;
use crate::opcode::Opcode;
use crate::types::{Instruction, Register, Suffix};
use tracing::trace;

/// Bytes moved per stack slot for a given suffix.
fn slot_size(suffix: Suffix) -> i32 {
    if suffix.is_20bit() {
        4
    } else {
        2
    }
}

/// Stack-pointer change caused by `insn`, if any.
///
/// Positive values shrink the stack (pop), negative values grow it (push).
pub fn stack_delta(insn: &Instruction) -> Option<i32> {
    use Opcode::{
        Add, Adda, Addc, Addcx, Addx, Decd, Decda, Decdx, Incd, Incda, Incdx, Pop, Popa, Popm,
        Popx, Push, Pushm, Pushx, Sub, Suba, Subc, Subcx, Subx,
    };

    let wide_enough = matches!(insn.suffix, Suffix::Word | Suffix::A | Suffix::Ax);
    // add.w #n, SP / subc.w #n, SP; other sources fall through
    let sp_imm = insn
        .op1
        .imm()
        .filter(|_| insn.op2.is_reg(Register::SP) && wide_enough);
    let delta = match insn.opcode {
        Add | Addx | Adda | Addc | Addcx | Sub | Subx | Suba | Subc | Subcx
            if sp_imm.is_some() =>
        {
            let value = sp_imm.unwrap_or_default();
            let bits = if insn.suffix == Suffix::Word { 16 } else { 20 };
            let delta = sign_extend(value, bits) as i32;
            if matches!(insn.opcode, Sub | Subx | Suba | Subc | Subcx) {
                -delta
            } else {
                delta
            }
        }
        Incd | Incdx | Incda if insn.op1.is_reg(Register::SP) && wide_enough => 2,
        Decd | Decdx | Decda if insn.op1.is_reg(Register::SP) && wide_enough => -2,
        Push => -2,
        Pushx => -slot_size(insn.suffix),
        Popx => slot_size(insn.suffix),
        Pushm | Popm => {
            // pushm.a #n, reg -> -n*4; popm.w #n, reg -> +n*2
            let count = insn.op1.imm().map_or(0, |n| n as i32);
            let delta = count * slot_size(insn.suffix);
            if insn.opcode == Popm {
                delta
            } else {
                -delta
            }
        }
        // mova @SP+, dst
        Popa => 4,
        _ if insn.opcode == Pop || insn.op1.is_autoinc(Register::SP) => slot_size(insn.suffix),
        _ => 0,
    };
    (delta != 0).then_some(delta)
}

/// Record the stack-pointer change of a flowing instruction.
///
/// The delta takes effect at the following instruction and is dropped when
/// the user fixed the delta there or no function contains `insn`.
pub fn trace_sp<H: AnalysisHost + ?Sized>(insn: &Instruction, host: &mut H) {
    let Some(function) = host.function_containing(insn.address) else {
        return;
    };
    let Some(delta) = stack_delta(insn) else {
        return;
    };
    let at = insn.end();
    if host.is_user_fixed_stack_delta(at) {
        trace!(address = at, delta, "stack delta fixed by user");
        return;
    }
    trace!(function, address = at, delta, "stack point");
    host.add_stack_delta(function, at, delta);
}
