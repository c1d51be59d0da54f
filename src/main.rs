//! MSP430 Disassembler CLI
//!
//! Command-line tool for disassembling and analyzing raw MSP430 images.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use msp430_analyzer::formatter::{HumanFormatter, JsonFormatter, ListingFormatter, ShortFormatter};
use msp430_analyzer::{sweep, AnalysisOptions, Decoder, SweepOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// MSP430/MSP430X disassembler.
///
/// Decodes raw memory images, rewrites emulated mnemonics and reports
/// cross-references, stack offsets and jump tables.
#[derive(Parser, Debug)]
#[command(name = "msp430-dis")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Raw image file(s) to disassemble
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Load address of the first byte (hex, e.g. C000 or 0xC000)
    #[arg(short, long, default_value = "0", value_parser = parse_address)]
    base: u32,

    /// Output format
    #[arg(short, long, default_value = "human")]
    format: OutputFormat,

    /// Show raw encodings instead of emulated mnemonics
    #[arg(long)]
    canonical: bool,

    /// Do not track the stack pointer
    #[arg(long)]
    no_stack: bool,

    /// Do not look for jump tables
    #[arg(long)]
    no_switches: bool,

    /// Append opcode descriptions as comments
    #[arg(short, long)]
    comments: bool,

    /// Maximum number of bytes to read from each file
    #[arg(long, default_value = "1048576")]
    max_bytes: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (only output instruction text)
    #[arg(short, long)]
    quiet: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable listing
    Human,
    /// JSON output
    Json,
    /// Compact single-line summary
    Short,
}

fn parse_address(s: &str) -> std::result::Result<u32, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .or_else(|| s.strip_suffix('h'))
        .unwrap_or(s);
    let value = u32::from_str_radix(digits, 16).map_err(|e| format!("invalid address '{s}': {e}"))?;
    if value > 0xF_FFFF {
        return Err(format!("address '{s}' is outside the 20-bit address space"));
    }
    Ok(value)
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging if verbose
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("msp430_analyzer=debug")
            .init();
    }

    let options = sweep_options(&args);
    let decoder = if args.canonical {
        Decoder::canonical()
    } else {
        Decoder::new()
    };

    let mut success = true;

    for path in &args.files {
        if let Err(e) = disassemble_file(path, &decoder, &options, &args) {
            if !args.quiet {
                eprintln!("Error disassembling {}: {:#}", path.display(), e);
            }
            success = false;
        }
    }

    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn sweep_options(args: &Args) -> SweepOptions {
    let mut analysis = AnalysisOptions::new();
    analysis.trace_stack_pointer = !args.no_stack;
    analysis.check_switches = !args.no_switches;

    let mut options = SweepOptions::new().with_base(args.base);
    options.max_bytes = args.max_bytes;
    options.analysis = analysis;
    options
}

fn disassemble_file(
    path: &Path,
    decoder: &Decoder,
    options: &SweepOptions,
    args: &Args,
) -> Result<()> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let listing = sweep::sweep_with(decoder, &data, options);

    let output = match args.format {
        OutputFormat::Human => {
            let mut formatter = if args.quiet {
                HumanFormatter::quiet()
            } else if args.verbose {
                HumanFormatter::verbose()
            } else {
                HumanFormatter::new()
            };
            formatter.comments |= args.comments;
            formatter.format_listing(&listing, path)
        }
        OutputFormat::Json => JsonFormatter::new().format_listing(&listing, path),
        OutputFormat::Short => ShortFormatter::new().format_listing(&listing, path),
    };
    print!("{output}");
    Ok(())
}
