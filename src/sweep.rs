//! Linear sweep over a raw memory image.
//!
//! The sweep decodes every instruction from the base address onwards,
//! stores the records in a [`Database`] and then runs the analyzer over
//! them in address order. Words that do not decode become data lines and
//! are reported as problems; the sweep then resumes at the next word.

use crate::analysis::Analyzer;
use crate::database::Database;
use crate::decoder::{is_sane, Decoder};
use crate::error::{DecodeError, Result};
use crate::reader::{Image, WordSource};
use crate::types::{Instruction, SweepOptions};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, trace};

/// One line of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Line {
    /// Address of the first byte.
    pub address: u32,
    /// Raw bytes covered by the line.
    pub bytes: Vec<u8>,
    /// Decoded instruction; `None` for data.
    pub insn: Option<Instruction>,
}

impl Line {
    /// True if the line holds an instruction.
    pub fn is_code(&self) -> bool {
        self.insn.is_some()
    }
}

/// Why a location was emitted as data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    /// The decoder rejected the bytes.
    Undecodable,
    /// All-zero or all-one word.
    Suspicious,
}

/// A location the sweep could not turn into code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    /// Address of the problem.
    pub address: u32,
    /// Problem category.
    pub kind: ProblemKind,
    /// Human-readable description.
    pub message: String,
}

/// Result of a sweep.
#[derive(Debug, Clone)]
pub struct Listing {
    /// Address of the first byte.
    pub base: u32,
    /// Lines in address order.
    pub lines: Vec<Line>,
    /// Locations emitted as data.
    pub problems: Vec<Problem>,
    /// Analysis results.
    pub database: Database,
}

impl Listing {
    /// Number of decoded instructions.
    pub fn instruction_count(&self) -> usize {
        self.lines.iter().filter(|line| line.is_code()).count()
    }

    /// Decoded instructions in address order.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.lines.iter().filter_map(|line| line.insn.as_ref())
    }
}

/// Disassemble and analyze `bytes` loaded at `options.base`.
pub fn sweep(bytes: &[u8], options: &SweepOptions) -> Listing {
    sweep_with(&Decoder::new(), bytes, options)
}

/// As [`sweep`], with an explicit decoder.
pub fn sweep_with(decoder: &Decoder, bytes: &[u8], options: &SweepOptions) -> Listing {
    let bytes = &bytes[..bytes.len().min(options.max_bytes)];
    let image = Image::new(options.base, bytes);
    let end = image.end();

    let mut database = Database::new();
    if options.single_function && !bytes.is_empty() {
        let last = u32::try_from(end).unwrap_or(u32::MAX);
        database.add_function(options.base, last);
    }

    let mut lines = Vec::new();
    let mut problems = Vec::new();
    let mut address = options.base;
    while u64::from(address) < end {
        let remaining = end - u64::from(address);
        let decoded = match image.read_word(address) {
            Ok(word) if !is_sane(word) => Err(Problem {
                address,
                kind: ProblemKind::Suspicious,
                message: format!("suspicious word 0x{word:04X}"),
            }),
            _ => decoder.decode(&image, address).map_err(|err| Problem {
                address,
                kind: ProblemKind::Undecodable,
                message: err.to_string(),
            }),
        };

        let step = match decoded {
            Ok(insn) => {
                database.record(insn);
                lines.push(Line {
                    address,
                    bytes: image
                        .slice(address, usize::from(insn.size))
                        .unwrap_or_default()
                        .to_vec(),
                    insn: Some(insn),
                });
                u32::from(insn.size)
            }
            Err(problem) => {
                trace!(address, message = %problem.message, "skipping data");
                problems.push(problem);
                // odd addresses resync to the next word boundary
                let step = if address & 1 == 0 { 2 } else { 1 };
                let step = step.min(remaining as u32);
                lines.push(Line {
                    address,
                    bytes: image
                        .slice(address, step as usize)
                        .unwrap_or_default()
                        .to_vec(),
                    insn: None,
                });
                step
            }
        };
        address = match address.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }

    let analyzer = Analyzer::new(options.analysis.clone());
    for line in &lines {
        if let Some(insn) = &line.insn {
            analyzer.emulate(insn, &mut database);
        }
    }

    debug!(
        base = options.base,
        lines = lines.len(),
        problems = problems.len(),
        "sweep complete"
    );
    Listing {
        base: options.base,
        lines,
        problems,
        database,
    }
}

/// Read a raw image from disk and sweep it.
pub fn disassemble_file<P: AsRef<Path>>(path: P, options: &SweepOptions) -> std::io::Result<Listing> {
    let data = std::fs::read(path)?;
    Ok(sweep(&data, options))
}

/// Decode instructions at independent addresses.
///
/// With the `parallel` feature the addresses are decoded on the rayon
/// thread pool; the result order always matches `addresses`.
pub fn decode_many<S>(decoder: &Decoder, source: &S, addresses: &[u32]) -> Vec<Result<Instruction>>
where
    S: WordSource + Sync + ?Sized,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        addresses
            .par_iter()
            .map(|&address| decoder.decode(source, address))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        addresses
            .iter()
            .map(|&address| decoder.decode(source, address))
            .collect()
    }
}

/// Count the decode failures in a batch result.
pub fn failures(results: &[Result<Instruction>]) -> impl Iterator<Item = &DecodeError> {
    results.iter().filter_map(|r| r.as_ref().err())
}
