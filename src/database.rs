//! In-memory analysis database.
//!
//! [`Database`] implements every collaborator trait of [`crate::analysis`]
//! with ordered maps so that listings and tests see a stable order.

use crate::analysis::{AnnotationSink, FrameTracker, InstructionHistory, SwitchConsumer, XrefSink};
use crate::types::{CodeRef, DataRef, DataWidth, Instruction, SwitchInfo};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// One cross-reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Xref<K> {
    /// Referencing instruction.
    pub from: u32,
    /// Referenced address.
    pub to: u32,
    /// Reference kind.
    pub kind: K,
}

/// A function's address range, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Function {
    /// First instruction.
    pub start: u32,
    /// One past the last byte.
    pub end: u32,
}

impl Function {
    /// True if `address` lies inside the function.
    pub fn contains(&self, address: u32) -> bool {
        (self.start..self.end).contains(&address)
    }
}

/// In-memory store for decoded instructions and analysis results.
#[derive(Debug, Clone, Default)]
pub struct Database {
    instructions: BTreeMap<u32, Instruction>,
    ends: HashMap<u32, u32>,
    functions: BTreeMap<u32, Function>,
    offsets: BTreeSet<(u32, usize)>,
    stack_vars: BTreeMap<(u32, usize), i32>,
    data_items: BTreeMap<u32, DataWidth>,
    fixed_deltas: BTreeSet<u32>,
    stack_points: BTreeMap<u32, i32>,
    recomputed: BTreeSet<u32>,
    switches: BTreeMap<u32, SwitchInfo>,
    code_refs: BTreeSet<Xref<CodeRef>>,
    data_refs: BTreeSet<Xref<DataRef>>,
}

impl Database {
    /// Create an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a decoded instruction so later lookups can walk backwards.
    pub fn record(&mut self, insn: Instruction) {
        if insn.is_null() {
            return;
        }
        self.ends.insert(insn.end(), insn.address);
        self.instructions.insert(insn.address, insn);
    }

    /// Instruction decoded at `address`.
    pub fn instruction(&self, address: u32) -> Option<&Instruction> {
        self.instructions.get(&address)
    }

    /// All decoded instructions in address order.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.values()
    }

    /// Declare a function covering `[start, end)`.
    pub fn add_function(&mut self, start: u32, end: u32) {
        self.functions.insert(start, Function { start, end });
    }

    /// All functions in address order.
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.values()
    }

    /// Pin the stack-pointer delta at `address`; the analyzer will not
    /// overwrite it.
    pub fn fix_stack_delta(&mut self, address: u32) {
        self.fixed_deltas.insert(address);
    }

    /// Stack-pointer change recorded at `address`.
    pub fn stack_point(&self, address: u32) -> Option<i32> {
        self.stack_points.get(&address).copied()
    }

    /// All stack points as `(address, delta)`.
    pub fn stack_points(&self) -> impl Iterator<Item = (u32, i32)> + '_ {
        self.stack_points.iter().map(|(&address, &delta)| (address, delta))
    }

    /// Stack-pointer offset at `address` relative to the function entry.
    pub fn sp_offset_at(&self, address: u32) -> Option<i32> {
        let function = self.function_at(address)?;
        Some(
            self.stack_points
                .range(function.start..=address)
                .map(|(_, &delta)| delta)
                .sum(),
        )
    }

    /// True if the analyzer asked for a recomputation at `address`.
    pub fn recomputed(&self, address: u32) -> bool {
        self.recomputed.contains(&address)
    }

    /// Stack variable frame offset of an operand.
    pub fn stack_variable(&self, address: u32, operand: usize) -> Option<i32> {
        self.stack_vars.get(&(address, operand)).copied()
    }

    /// Width of the data item defined at `address`.
    pub fn data_item(&self, address: u32) -> Option<DataWidth> {
        self.data_items.get(&address).copied()
    }

    /// All data items in address order.
    pub fn data_items(&self) -> impl Iterator<Item = (u32, DataWidth)> + '_ {
        self.data_items.iter().map(|(&address, &width)| (address, width))
    }

    /// Switch anchored at `address`.
    pub fn switch_at(&self, address: u32) -> Option<&SwitchInfo> {
        self.switches.get(&address)
    }

    /// All switches as `(anchor, info)`.
    pub fn switches(&self) -> impl Iterator<Item = (u32, &SwitchInfo)> {
        self.switches.iter().map(|(&address, info)| (address, info))
    }

    /// All code references.
    pub fn code_refs(&self) -> impl Iterator<Item = &Xref<CodeRef>> {
        self.code_refs.iter()
    }

    /// All data references.
    pub fn data_refs(&self) -> impl Iterator<Item = &Xref<DataRef>> {
        self.data_refs.iter()
    }

    /// Code references leaving `from`.
    pub fn code_refs_from(&self, from: u32) -> impl Iterator<Item = &Xref<CodeRef>> {
        self.code_refs.iter().filter(move |x| x.from == from)
    }

    /// Data references leaving `from`.
    pub fn data_refs_from(&self, from: u32) -> impl Iterator<Item = &Xref<DataRef>> {
        self.data_refs.iter().filter(move |x| x.from == from)
    }

    /// True if the code reference exists.
    pub fn has_code_ref(&self, from: u32, to: u32, kind: CodeRef) -> bool {
        self.code_refs.contains(&Xref { from, to, kind })
    }

    /// True if the data reference exists.
    pub fn has_data_ref(&self, from: u32, to: u32, kind: DataRef) -> bool {
        self.data_refs.contains(&Xref { from, to, kind })
    }

    fn function_at(&self, address: u32) -> Option<&Function> {
        self.functions
            .range(..=address)
            .next_back()
            .map(|(_, f)| f)
            .filter(|f| f.contains(address))
    }
}

impl AnnotationSink for Database {
    fn mark_offset(&mut self, address: u32, operand: usize) {
        self.offsets.insert((address, operand));
    }

    fn is_offset(&self, address: u32, operand: usize) -> bool {
        self.offsets.contains(&(address, operand))
    }

    fn mark_stack_variable(&mut self, address: u32, operand: usize, frame_offset: i32) {
        self.stack_vars.insert((address, operand), frame_offset);
    }

    fn is_stack_variable(&self, address: u32, operand: usize) -> bool {
        self.stack_vars.contains_key(&(address, operand))
    }

    fn define_data(&mut self, address: u32, width: DataWidth) {
        self.data_items.entry(address).or_insert(width);
    }

    fn is_user_fixed_stack_delta(&self, address: u32) -> bool {
        self.fixed_deltas.contains(&address)
    }
}

impl XrefSink for Database {
    fn add_code_ref(&mut self, from: u32, to: u32, kind: CodeRef) {
        self.code_refs.insert(Xref { from, to, kind });
    }

    fn add_data_ref(&mut self, from: u32, to: u32, kind: DataRef) {
        self.data_refs.insert(Xref { from, to, kind });
    }
}

impl FrameTracker for Database {
    fn function_containing(&self, address: u32) -> Option<u32> {
        self.function_at(address).map(|f| f.start)
    }

    fn add_stack_delta(&mut self, _function: u32, address: u32, delta: i32) {
        self.stack_points.insert(address, delta);
    }

    fn recompute_stack_delta(&mut self, address: u32) {
        self.recomputed.insert(address);
    }
}

impl SwitchConsumer for Database {
    fn has_switch(&self, address: u32) -> bool {
        self.switches.contains_key(&address)
    }

    fn register_switch(&mut self, address: u32, info: SwitchInfo) {
        self.switches.insert(address, info);
    }
}

impl InstructionHistory for Database {
    fn previous(&self, address: u32) -> Option<Instruction> {
        let start = self.ends.get(&address)?;
        self.instructions.get(start).copied()
    }
}
