//! Flow and frame analysis.
//!
//! The analyzer walks one decoded instruction at a time and reports what it
//! learns to a set of collaborator traits: cross-references, offsets and
//! stack variables, stack-pointer deltas and recovered jump tables. It keeps
//! no state of its own; everything lives behind [`AnalysisHost`].
//!
//! [`crate::database::Database`] implements every collaborator in memory.

pub mod stack;
pub mod switch;

use crate::decoder::sign_extend;
use crate::opcode::{Features, Opcode};
use crate::types::{
    AnalysisOptions, CodeRef, DataRef, DataWidth, Instruction, OperandKind, Register, Suffix,
    SwitchInfo,
};
use tracing::trace;

/// Per-operand annotations owned by the host database.
///
/// Operands are addressed by the instruction address and their index
/// (0 for the first operand, 1 for the second).
pub trait AnnotationSink {
    /// Display the operand as an address.
    fn mark_offset(&mut self, address: u32, operand: usize);
    /// True if the operand is displayed as an address.
    fn is_offset(&self, address: u32, operand: usize) -> bool;
    /// Display the operand as a stack variable at `frame_offset` from SP.
    fn mark_stack_variable(&mut self, address: u32, operand: usize, frame_offset: i32);
    /// True if the operand is displayed as a stack variable.
    fn is_stack_variable(&self, address: u32, operand: usize) -> bool;
    /// Create a data item of `width` at `address`.
    fn define_data(&mut self, address: u32, width: DataWidth);
    /// True if the user pinned the stack-pointer delta at `address`.
    fn is_user_fixed_stack_delta(&self, address: u32) -> bool;
}

/// Cross-reference sink.
pub trait XrefSink {
    /// Record a control-flow edge.
    fn add_code_ref(&mut self, from: u32, to: u32, kind: CodeRef);
    /// Record a data reference.
    fn add_data_ref(&mut self, from: u32, to: u32, kind: DataRef);
}

/// Function and stack-pointer bookkeeping.
pub trait FrameTracker {
    /// Start address of the function containing `address`, if any.
    fn function_containing(&self, address: u32) -> Option<u32>;
    /// Record a stack-pointer change of `delta` bytes taking effect at `address`.
    fn add_stack_delta(&mut self, function: u32, address: u32, delta: i32);
    /// Recompute the stack-pointer value after a non-flowing instruction.
    fn recompute_stack_delta(&mut self, address: u32);
}

/// Jump-table registry.
pub trait SwitchConsumer {
    /// True if a switch is already registered at `address`.
    fn has_switch(&self, address: u32) -> bool;
    /// Register the switch anchored at `address`.
    fn register_switch(&mut self, address: u32, info: SwitchInfo);
}

/// Backward access to already decoded instructions.
pub trait InstructionHistory {
    /// The instruction that ends exactly at `address`.
    fn previous(&self, address: u32) -> Option<Instruction>;
}

/// Everything the analyzer talks to.
pub trait AnalysisHost:
    AnnotationSink + XrefSink + FrameTracker + SwitchConsumer + InstructionHistory
{
}

impl<T> AnalysisHost for T where
    T: AnnotationSink + XrefSink + FrameTracker + SwitchConsumer + InstructionHistory + ?Sized
{
}

/// Flow and frame analyzer.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    options: AnalysisOptions,
}

impl Analyzer {
    /// Analyzer with the given options.
    pub fn new(options: AnalysisOptions) -> Self {
        Self { options }
    }

    /// Current options.
    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Emulate one instruction against `host`.
    ///
    /// Returns `true` if execution continues with the next instruction.
    pub fn emulate<H: AnalysisHost + ?Sized>(&self, insn: &Instruction, host: &mut H) -> bool {
        let features = insn.features();
        if features.contains(Features::USE1) {
            self.handle_operand(insn, 0, true, host);
        }
        if features.contains(Features::CHG1) {
            self.handle_operand(insn, 0, false, host);
        }
        if features.contains(Features::USE2) {
            self.handle_operand(insn, 1, true, host);
        }
        if features.contains(Features::CHG2) {
            self.handle_operand(insn, 1, false, host);
        }

        let flow = flows(insn);
        if flow {
            host.add_code_ref(insn.address, insn.end(), CodeRef::Fallthrough);
        } else if self.options.check_switches {
            switch::check_switch(insn, host);
        }

        if self.options.trace_stack_pointer {
            if flow {
                stack::trace_sp(insn, host);
            } else {
                host.recompute_stack_delta(insn.address);
            }
        }
        flow
    }

    fn handle_operand<H: AnalysisHost + ?Sized>(
        &self,
        insn: &Instruction,
        n: usize,
        is_read: bool,
        host: &mut H,
    ) {
        let Some(op) = insn.operand(n) else {
            return;
        };
        let from = insn.address;
        let mut is_offset = host.is_offset(from, n);
        let has_repr = is_offset || host.is_stack_variable(from, n);
        let access = if is_read { DataRef::Read } else { DataRef::Write };

        match op.kind {
            OperandKind::Imm(value) => {
                let edge = if matches!(insn.opcode, Opcode::Call | Opcode::Calla) {
                    Some(CodeRef::CallTarget)
                } else if is_branch(insn) {
                    Some(CodeRef::JumpTaken)
                } else {
                    None
                };
                if let Some(kind) = edge {
                    host.add_code_ref(from, value, kind);
                    if !has_repr {
                        host.mark_offset(from, n);
                        is_offset = true;
                    }
                }
                if is_offset {
                    host.add_data_ref(from, value, DataRef::Offset);
                }
            }
            OperandKind::Displ { reg, disp } => {
                if is_offset {
                    host.add_data_ref(from, disp, access);
                } else if self.options.create_stack_vars && !has_repr && reg == Register::SP {
                    if host.function_containing(from).is_some() {
                        let bits = if op.width == DataWidth::AddressWord { 20 } else { 16 };
                        let frame_offset = sign_extend(disp, bits) as i32;
                        trace!(address = from, operand = n, frame_offset, "stack variable");
                        host.mark_stack_variable(from, n, frame_offset);
                    }
                }
            }
            OperandKind::Mem { addr, .. } => {
                host.define_data(addr, op.width);
                host.add_data_ref(from, addr, access);
            }
            OperandKind::Near(addr) => {
                host.add_code_ref(from, addr, CodeRef::JumpTaken);
            }
            OperandKind::Void | OperandKind::Reg(_) | OperandKind::Indirect { .. } => {}
        }
    }
}

/// `mov.w src, PC`
pub(crate) fn is_mov_pc(insn: &Instruction) -> bool {
    insn.opcode == Opcode::Mov && insn.op2.is_reg(Register::PC) && insn.suffix == Suffix::Word
}

/// Branch through `br`, `bra` or `mov.w src, PC`.
pub(crate) fn is_branch(insn: &Instruction) -> bool {
    is_mov_pc(insn) || matches!(insn.opcode, Opcode::Br | Opcode::Bra)
}

/// True if an operand the instruction modifies is the PC register.
pub fn changes_pc(insn: &Instruction) -> bool {
    let features = insn.features();
    (features.contains(Features::CHG2) && insn.op2.is_reg(Register::PC))
        || (features.contains(Features::CHG1) && insn.op1.is_reg(Register::PC))
}

/// True if execution can continue with the next instruction.
pub fn flows(insn: &Instruction) -> bool {
    let unconditional = matches!(insn.opcode, Opcode::Jmp | Opcode::Br | Opcode::Bra)
        || changes_pc(insn);
    !insn.features().contains(Features::STOP) && !unconditional
}
