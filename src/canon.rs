//! Emulated-mnemonic rewriting.
//!
//! Hardware opcodes with a recognizable source pattern are renamed to the
//! TI emulated mnemonics (`mov @SP+,PC` is `ret`, `add #1,dst` is `inc dst`
//! and so on). Rules are checked in table order and the first match wins.

use crate::opcode::Opcode;
use crate::types::{Instruction, Operand, Register, Suffix};

/// Source pattern a rule must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pattern {
    /// Source is the immediate value.
    Imm(u32),
    /// Source is the immediate value and the destination is the register.
    ImmTo(u32, Register),
    /// Source is `@SP+`.
    PopSp,
    /// Source is `@SP+` and the destination is the register.
    PopSpTo(Register),
    /// Source is structurally identical to the destination.
    SameOp,
    /// Destination is the register, with a `.w` suffix.
    ToWord(Register),
    /// Destination is the register.
    To(Register),
}

impl Pattern {
    fn matches(self, insn: &Instruction) -> bool {
        let (src, dst) = (&insn.op1, &insn.op2);
        match self {
            Pattern::Imm(value) => src.is_imm(value),
            Pattern::ImmTo(value, reg) => src.is_imm(value) && dst.is_reg(reg),
            Pattern::PopSp => src.is_autoinc(Register::SP),
            Pattern::PopSpTo(reg) => src.is_autoinc(Register::SP) && dst.is_reg(reg),
            Pattern::SameOp => src.same_as(dst),
            Pattern::ToWord(reg) => dst.is_reg(reg) && insn.suffix == Suffix::Word,
            Pattern::To(reg) => dst.is_reg(reg),
        }
    }
}

/// What happens to the operands after a rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keep {
    /// Drop both operands.
    None,
    /// Keep the first operand only.
    First,
    /// Move the second operand into the first slot.
    Second,
}

type Rule = (Pattern, Opcode, Keep);

const MINUS_ONE: u32 = u32::MAX;

static RULES: &[(Opcode, &[Rule])] = &[
    (
        Opcode::Addc,
        &[
            (Pattern::Imm(0), Opcode::Adc, Keep::Second),
            (Pattern::SameOp, Opcode::Rlc, Keep::First),
        ],
    ),
    (
        Opcode::Addcx,
        &[
            (Pattern::Imm(0), Opcode::Adcx, Keep::Second),
            (Pattern::SameOp, Opcode::Rlcx, Keep::First),
        ],
    ),
    (
        Opcode::Mov,
        &[
            (Pattern::ImmTo(0, Register::R3), Opcode::Nop, Keep::None),
            (Pattern::Imm(0), Opcode::Clr, Keep::Second),
            (Pattern::PopSpTo(Register::PC), Opcode::Ret, Keep::None),
            (Pattern::PopSp, Opcode::Pop, Keep::Second),
            (Pattern::ToWord(Register::PC), Opcode::Br, Keep::First),
        ],
    ),
    (
        Opcode::Movx,
        &[
            (Pattern::Imm(0), Opcode::Clrx, Keep::Second),
            (Pattern::PopSp, Opcode::Popx, Keep::Second),
        ],
    ),
    (
        Opcode::Mova,
        &[
            (Pattern::Imm(0), Opcode::Clra, Keep::Second),
            (Pattern::PopSpTo(Register::PC), Opcode::Reta, Keep::None),
            (Pattern::PopSp, Opcode::Popa, Keep::Second),
            (Pattern::To(Register::PC), Opcode::Bra, Keep::First),
        ],
    ),
    (
        Opcode::Bic,
        &[
            (Pattern::ImmTo(1, Register::SR), Opcode::Clrc, Keep::None),
            (Pattern::ImmTo(2, Register::SR), Opcode::Clrz, Keep::None),
            (Pattern::ImmTo(4, Register::SR), Opcode::Clrn, Keep::None),
            (Pattern::ImmTo(8, Register::SR), Opcode::Dint, Keep::None),
        ],
    ),
    (
        Opcode::Bis,
        &[
            (Pattern::ImmTo(1, Register::SR), Opcode::Setc, Keep::None),
            (Pattern::ImmTo(2, Register::SR), Opcode::Setz, Keep::None),
            (Pattern::ImmTo(4, Register::SR), Opcode::Setn, Keep::None),
            (Pattern::ImmTo(8, Register::SR), Opcode::Eint, Keep::None),
        ],
    ),
    (Opcode::Dadd, &[(Pattern::Imm(0), Opcode::Dadc, Keep::Second)]),
    (Opcode::Daddx, &[(Pattern::Imm(0), Opcode::Dadcx, Keep::Second)]),
    (
        Opcode::Sub,
        &[
            (Pattern::Imm(1), Opcode::Dec, Keep::Second),
            (Pattern::Imm(2), Opcode::Decd, Keep::Second),
        ],
    ),
    (
        Opcode::Subx,
        &[
            (Pattern::Imm(1), Opcode::Decx, Keep::Second),
            (Pattern::Imm(2), Opcode::Decdx, Keep::Second),
        ],
    ),
    (Opcode::Suba, &[(Pattern::Imm(2), Opcode::Decda, Keep::Second)]),
    (Opcode::Subc, &[(Pattern::Imm(0), Opcode::Sbc, Keep::Second)]),
    (Opcode::Subcx, &[(Pattern::Imm(0), Opcode::Sbcx, Keep::Second)]),
    (
        Opcode::Add,
        &[
            (Pattern::Imm(1), Opcode::Inc, Keep::Second),
            (Pattern::Imm(2), Opcode::Incd, Keep::Second),
            (Pattern::SameOp, Opcode::Rla, Keep::First),
        ],
    ),
    (Opcode::Adda, &[(Pattern::Imm(2), Opcode::Incda, Keep::Second)]),
    (
        Opcode::Addx,
        &[
            (Pattern::Imm(1), Opcode::Incx, Keep::Second),
            (Pattern::Imm(2), Opcode::Incdx, Keep::Second),
            (Pattern::SameOp, Opcode::Rlax, Keep::First),
        ],
    ),
    (Opcode::Xor, &[(Pattern::Imm(MINUS_ONE), Opcode::Inv, Keep::Second)]),
    (Opcode::Xorx, &[(Pattern::Imm(MINUS_ONE), Opcode::Invx, Keep::Second)]),
    (Opcode::Cmp, &[(Pattern::Imm(0), Opcode::Tst, Keep::Second)]),
    (Opcode::Cmpx, &[(Pattern::Imm(0), Opcode::Tstx, Keep::Second)]),
    (Opcode::Cmpa, &[(Pattern::Imm(0), Opcode::Tsta, Keep::Second)]),
];

fn rules_for(opcode: Opcode) -> &'static [Rule] {
    RULES
        .iter()
        .find(|(op, _)| *op == opcode)
        .map_or(&[][..], |&(_, rules)| rules)
}

/// Rewrite `insn` into its emulated form, if one applies.
///
/// Returns `true` when a rule matched.
pub fn simplify(insn: &mut Instruction) -> bool {
    let Some(&(_, opcode, keep)) = rules_for(insn.opcode)
        .iter()
        .find(|(pattern, _, _)| pattern.matches(insn))
    else {
        return false;
    };

    insn.opcode = opcode;
    match keep {
        Keep::None => insn.op1 = Operand::void(),
        Keep::First => {}
        Keep::Second => insn.op1 = insn.op2,
    }
    insn.op2 = Operand::void();
    if opcode.is_suffixless() && insn.suffix == Suffix::Word {
        insn.suffix = Suffix::None;
    }
    true
}
