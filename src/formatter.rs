//! Output formatters for instructions and listings.
//!
//! The free functions render one instruction as assembler text. The
//! [`ListingFormatter`] implementations turn a whole [`Listing`] into
//! human-readable, JSON or compact output.

use crate::database::Xref;
use crate::decoder::sign_extend;
use crate::sweep::{Line, Listing, Problem};
use crate::types::{
    CodeRef, DataRef, DataWidth, Instruction, MemMode, Operand, OperandKind, Repeat, Suffix,
    SwitchInfo,
};
use std::path::Path;

/// Width of the mnemonic column.
const MNEMONIC_WIDTH: usize = 8;

/// Format a number the way MSP430 assemblers print it: small values in
/// decimal, everything else as hex with an `h` suffix (`0FFFFh`).
pub fn format_number(value: u32) -> String {
    if value < 10 {
        return value.to_string();
    }
    let s = format!("{value:X}h");
    if s.starts_with(|c: char| c.is_ascii_alphabetic()) {
        format!("0{s}")
    } else {
        s
    }
}

fn format_signed(value: i64) -> String {
    let magnitude = format_number(value.unsigned_abs() as u32);
    if value < 0 {
        format!("-{magnitude}")
    } else {
        magnitude
    }
}

fn immediate_mask(suffix: Suffix) -> u32 {
    match suffix {
        Suffix::Byte => 0xFF,
        Suffix::Word => 0xFFFF,
        _ => 0xF_FFFF,
    }
}

/// Render one operand.
pub fn format_operand(insn: &Instruction, op: &Operand) -> String {
    match op.kind {
        OperandKind::Void => String::new(),
        OperandKind::Reg(reg) => reg.to_string(),
        OperandKind::Imm(value) => {
            format!("#{}", format_number(value & immediate_mask(insn.suffix)))
        }
        OperandKind::Mem { addr, mode } => match mode {
            MemMode::Absolute => format!("&{}", format_number(addr)),
            MemMode::Symbolic => format_number(addr),
        },
        OperandKind::Near(addr) => format_number(addr),
        OperandKind::Displ { reg, disp } => {
            // 16-bit indexes are signed, 20-bit ones are not
            let index = if insn.suffix.is_20bit() || op.width == DataWidth::AddressWord {
                format_number(disp & 0xFF_FFFF)
            } else {
                format_signed(sign_extend(disp, 16))
            };
            format!("{index}({reg})")
        }
        OperandKind::Indirect { reg, autoinc } => {
            if autoinc {
                format!("@{reg}+")
            } else {
                format!("@{reg}")
            }
        }
    }
}

/// Mnemonic with its size suffix.
pub fn format_mnemonic(insn: &Instruction) -> String {
    format!("{}{}", insn.opcode.name(), insn.suffix.as_str())
}

/// `.zc` / `.rpt` lines printed before the instruction.
pub fn format_modifiers(insn: &Instruction) -> Vec<String> {
    let mut lines = Vec::new();
    if !insn.has_modifiers() {
        return lines;
    }
    if insn.zero_carry {
        lines.push(String::from(".zc"));
    }
    match insn.repeat {
        Repeat::None => {}
        Repeat::Register(reg) => lines.push(format!(".rpt {reg}")),
        Repeat::Count(n) => lines.push(format!(".rpt #{n}")),
    }
    lines
}

/// Instruction text without modifier lines, e.g. `mov.w   #5A80h, &120h`.
pub fn format_instruction(insn: &Instruction) -> String {
    let mnemonic = format_mnemonic(insn);
    let operands: Vec<String> = [&insn.op1, &insn.op2]
        .into_iter()
        .filter(|op| !op.is_void())
        .map(|op| format_operand(insn, op))
        .collect();
    if operands.is_empty() {
        mnemonic
    } else {
        format!("{mnemonic:<MNEMONIC_WIDTH$}{}", operands.join(", "))
    }
}

/// Every output line of one instruction, modifiers first.
pub fn format_lines(insn: &Instruction) -> Vec<String> {
    let mut lines = format_modifiers(insn);
    lines.push(format_instruction(insn));
    lines
}

fn format_data(line: &Line) -> String {
    match line.bytes[..] {
        [lo, hi] => format!(
            "{:<MNEMONIC_WIDTH$}{}",
            ".word",
            format_number(u32::from(u16::from_le_bytes([lo, hi])))
        ),
        _ => {
            let bytes: Vec<String> = line
                .bytes
                .iter()
                .map(|&b| format_number(u32::from(b)))
                .collect();
            format!("{:<MNEMONIC_WIDTH$}{}", ".byte", bytes.join(", "))
        }
    }
}

/// Trait for formatting listings.
///
/// Implementors render each component of a listing; the default
/// `format_listing` concatenates them.
pub trait ListingFormatter {
    /// Format the file path header.
    fn format_file(&self, path: &Path) -> String;

    /// Format one listing line.
    fn format_line(&self, line: &Line, listing: &Listing) -> Option<String>;

    /// Format the recovered jump tables.
    fn format_switches(&self, listing: &Listing) -> Option<String>;

    /// Format the problem list.
    fn format_problems(&self, problems: &[Problem]) -> Option<String>;

    /// Format the complete listing.
    fn format_listing(&self, listing: &Listing, path: &Path) -> String {
        let mut parts = vec![self.format_file(path)];
        parts.extend(
            listing
                .lines
                .iter()
                .filter_map(|line| self.format_line(line, listing)),
        );
        if let Some(s) = self.format_switches(listing) {
            parts.push(s);
        }
        if let Some(s) = self.format_problems(&listing.problems) {
            parts.push(s);
        }
        parts.join("")
    }
}

/// Human-readable output formatter.
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter {
    /// Show stack offsets and cross-references
    pub verbose: bool,
    /// Only the instruction text
    pub quiet: bool,
    /// Append the opcode description as a comment
    pub comments: bool,
}

impl HumanFormatter {
    /// Create a new human formatter with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a verbose formatter.
    pub fn verbose() -> Self {
        Self {
            verbose: true,
            comments: true,
            ..Self::default()
        }
    }

    /// Create a quiet formatter.
    pub fn quiet() -> Self {
        Self {
            quiet: true,
            ..Self::default()
        }
    }

    fn prefix(&self, line: &Line, listing: &Listing) -> String {
        if self.quiet {
            return String::new();
        }
        let mut s = format!("{:05X}  {:<16}  ", line.address, hex::encode_upper(&line.bytes));
        if self.verbose {
            match listing.database.sp_offset_at(line.address) {
                Some(sp) => s.push_str(&format!("{sp:>4}  ")),
                None => s.push_str("      "),
            }
        }
        s
    }

    fn annotations(&self, insn: &Instruction, listing: &Listing) -> Vec<String> {
        let mut notes = Vec::new();
        if self.comments && !insn.opcode.comment().is_empty() {
            notes.push(insn.opcode.comment().to_string());
        }
        if self.verbose {
            let db = &listing.database;
            notes.extend(
                db.code_refs_from(insn.address)
                    .filter(|x| x.to != insn.end())
                    .map(|x| format!("{:?} {:05X}", x.kind, x.to)),
            );
            notes.extend(
                db.data_refs_from(insn.address)
                    .map(|x| format!("{:?} {:05X}", x.kind, x.to)),
            );
        }
        notes
    }
}

impl ListingFormatter for HumanFormatter {
    fn format_file(&self, path: &Path) -> String {
        if self.quiet {
            String::new()
        } else {
            format!("File: {}\n", path.display())
        }
    }

    fn format_line(&self, line: &Line, listing: &Listing) -> Option<String> {
        let prefix = self.prefix(line, listing);
        let Some(insn) = &line.insn else {
            return Some(format!("{prefix}{}\n", format_data(line)));
        };

        let mut s = String::new();
        let blank = " ".repeat(prefix.len());
        for modifier in format_modifiers(insn) {
            s.push_str(&format!("{blank}{modifier}\n"));
        }
        s.push_str(&prefix);
        s.push_str(&format_instruction(insn));
        let notes = self.annotations(insn, listing);
        if !notes.is_empty() {
            s.push_str(&format!("  ; {}", notes.join("; ")));
        }
        s.push('\n');
        Some(s)
    }

    fn format_switches(&self, listing: &Listing) -> Option<String> {
        if self.quiet {
            return None;
        }
        let mut switches = listing.database.switches().peekable();
        switches.peek()?;
        let mut s = String::from("Switches:\n");
        for (address, info) in switches {
            s.push_str(&format!(
                "  {:05X}  table {:05X}, {} cases on {}, default {:05X}\n",
                address, info.jumps, info.ncases, info.index_register, info.default_target
            ));
        }
        Some(s)
    }

    fn format_problems(&self, problems: &[Problem]) -> Option<String> {
        if problems.is_empty() || self.quiet {
            return None;
        }
        if !self.verbose {
            return Some(format!("  [warn] {} location(s) left as data\n", problems.len()));
        }
        let mut s = String::new();
        for problem in problems {
            s.push_str(&format!("  [warn] {:05X}: {}\n", problem.address, problem.message));
        }
        Some(s)
    }
}

/// JSON output formatter.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    /// Pretty-print JSON
    pub pretty: bool,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl JsonFormatter {
    /// Create a new JSON formatter with pretty printing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compact JSON formatter.
    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl ListingFormatter for JsonFormatter {
    fn format_file(&self, _path: &Path) -> String {
        String::new() // Handled in format_listing
    }

    fn format_line(&self, _line: &Line, _listing: &Listing) -> Option<String> {
        None // Handled in format_listing
    }

    fn format_switches(&self, _listing: &Listing) -> Option<String> {
        None // Handled in format_listing
    }

    fn format_problems(&self, _problems: &[Problem]) -> Option<String> {
        None // Handled in format_listing
    }

    fn format_listing(&self, listing: &Listing, path: &Path) -> String {
        #[derive(serde::Serialize)]
        struct JsonOutput<'a> {
            file: String,
            base: u32,
            lines: Vec<LineJson<'a>>,
            switches: Vec<SwitchJson<'a>>,
            code_refs: Vec<&'a Xref<CodeRef>>,
            data_refs: Vec<&'a Xref<DataRef>>,
            stack_points: Vec<(u32, i32)>,
            problems: &'a [Problem],
        }

        #[derive(serde::Serialize)]
        struct LineJson<'a> {
            address: u32,
            bytes: String,
            text: Vec<String>,
            insn: Option<&'a Instruction>,
        }

        #[derive(serde::Serialize)]
        struct SwitchJson<'a> {
            address: u32,
            #[serde(flatten)]
            info: &'a SwitchInfo,
        }

        let output = JsonOutput {
            file: path.display().to_string(),
            base: listing.base,
            lines: listing
                .lines
                .iter()
                .map(|line| LineJson {
                    address: line.address,
                    bytes: hex::encode(&line.bytes),
                    text: match &line.insn {
                        Some(insn) => format_lines(insn),
                        None => vec![format_data(line)],
                    },
                    insn: line.insn.as_ref(),
                })
                .collect(),
            switches: listing
                .database
                .switches()
                .map(|(address, info)| SwitchJson { address, info })
                .collect(),
            code_refs: listing.database.code_refs().collect(),
            data_refs: listing.database.data_refs().collect(),
            stack_points: listing.database.stack_points().collect(),
            problems: &listing.problems,
        };

        if self.pretty {
            serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
        } else {
            serde_json::to_string(&output).unwrap_or_else(|_| "{}".to_string())
        }
    }
}

/// Compact single-line summary formatter.
#[derive(Debug, Clone, Default)]
pub struct ShortFormatter;

impl ShortFormatter {
    /// Create a new short formatter.
    pub fn new() -> Self {
        Self
    }
}

impl ListingFormatter for ShortFormatter {
    fn format_file(&self, _path: &Path) -> String {
        String::new() // Handled in format_listing
    }

    fn format_line(&self, _line: &Line, _listing: &Listing) -> Option<String> {
        None
    }

    fn format_switches(&self, _listing: &Listing) -> Option<String> {
        None
    }

    fn format_problems(&self, _problems: &[Problem]) -> Option<String> {
        None
    }

    fn format_listing(&self, listing: &Listing, path: &Path) -> String {
        format!(
            "{}\t{:05X}\t{}\t{}\t{}\n",
            path.display(),
            listing.base,
            listing.instruction_count(),
            listing.database.switches().count(),
            listing.problems.len()
        )
    }
}
