//! shrinkr CLI - raw data cruncher
//!
//! Compresses a file into a bare range-coded stream, or restores one.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use clap::{ArgAction, Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use shrinkr::{compress_with_progress, decompress_with_limit, PackOptions, PackStats};

/// Default cap on decompressed output.
const DEFAULT_MAX_OUTPUT: usize = 256 * 1024 * 1024;

/// Crunch raw data with optimal-parse LZ and range coding.
#[derive(Parser, Debug)]
#[command(name = "shrinkr")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file (defaults to INPUT.shr, or INPUT.out when decompressing)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Decompress instead of compress
    #[arg(short, long)]
    decompress: bool,

    /// Starting settings; individual flags override them
    #[arg(long, value_enum, default_value = "balanced")]
    preset: PresetArg,

    /// Number of parse-and-refine iterations
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=9))]
    iterations: Option<u32>,

    /// Shorter match lengths to try below each match
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(0..=100))]
    length_margin: Option<u32>,

    /// Equal-length matches reported per position
    #[arg(short = 'a', long, value_parser = clap::value_parser!(u32).range(1..=100_000))]
    same_length: Option<u32>,

    /// Distance-one matches kept in a run of one byte
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=100_000))]
    consecutive: Option<u32>,

    /// Take matches at least this long without searching alternatives
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(2..=100_000))]
    skip_length: Option<u32>,

    /// Number of reference edges to keep in memory
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1000..=10_000_000))]
    references: Option<u32>,

    /// Zero bytes appended after the data
    #[arg(short, long, default_value = "0")]
    zero_padding: usize,

    /// Refuse to decompress more than this many bytes
    #[arg(short, long, value_name = "BYTES", default_value_t = DEFAULT_MAX_OUTPUT)]
    max_output: usize,

    /// Select literal contexts without position parity
    #[arg(long)]
    no_parity: bool,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PresetArg {
    /// One iteration, narrow search
    Fast,
    /// Default settings
    Balanced,
    /// Nine iterations, wide search, large edge budget
    Max,
}

impl Args {
    fn pack_options(&self) -> PackOptions {
        let mut options = match self.preset {
            PresetArg::Fast => PackOptions::fast(),
            PresetArg::Balanced => PackOptions::balanced(),
            PresetArg::Max => PackOptions::max_compression(),
        };
        let set = |value: Option<u32>, field: &mut usize| {
            if let Some(value) = value {
                *field = value as usize;
            }
        };
        set(self.iterations, &mut options.iterations);
        set(self.length_margin, &mut options.length_margin);
        set(self.same_length, &mut options.max_same_length);
        set(self.consecutive, &mut options.max_consecutive);
        set(self.skip_length, &mut options.skip_length);
        set(self.references, &mut options.max_edges);
        options.parity_context = !self.no_parity;
        options
    }

    fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            let mut name = self.input.clone().into_os_string();
            name.push(if self.decompress { ".out" } else { ".shr" });
            PathBuf::from(name)
        })
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("shrinkr={level}")))
        .with_writer(std::io::stderr)
        .init();

    let input = fs::read(&args.input)?;
    let output_path = args.output_path();
    let start = Instant::now();

    let output = if args.decompress {
        decompress_with_limit(&input, !args.no_parity, args.max_output)?
    } else {
        let options = args.pack_options();
        let show_progress = args.verbose > 0;
        let mut last_percent = None;
        let (packed, stats) =
            compress_with_progress(&input, args.zero_padding, &options, |pos, total| {
                let percent = pos * 100 / total.max(1);
                if show_progress && last_percent != Some(percent) {
                    last_percent = Some(percent);
                    eprint!("\r  Parsing: {percent:3}%");
                    let _ = std::io::stderr().flush();
                }
            })?;
        if show_progress {
            eprintln!();
        }
        report_pack(&options, &stats);
        packed
    };
    let elapsed = start.elapsed();

    fs::write(&output_path, &output)?;

    let input_size = input.len() as u64;
    let output_size = output.len() as u64;
    let ratio = if input_size > 0 {
        (output_size as f64 / input_size as f64) * 100.0
    } else {
        0.0
    };
    if args.verbose > 0 {
        eprintln!("Output: {:?}", output_path);
        eprintln!("  Time: {:.2?}", elapsed);
    }
    println!(
        "{} -> {} ({:.1}%)",
        format_size(input_size),
        format_size(output_size),
        ratio
    );
    Ok(())
}

fn report_pack(options: &PackOptions, stats: &PackStats) {
    for (i, size) in stats.iteration_sizes.iter().enumerate() {
        eprintln!("  Iteration {}: {} bytes", i + 1, size.div_ceil(8));
    }
    eprintln!("  References considered: {}", stats.peak_edges);
    eprintln!("  References discarded: {}", stats.evicted_edges);
    eprintln!("  References in output: {}", stats.references);
    if stats.edge_budget_exceeded {
        eprintln!(
            "Note: the reference buffer of {} edges was too small; \
             a larger --references value may compress better.",
            options.max_edges
        );
    }
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_output_flag() {
        let args = Args::try_parse_from(["shrinkr", "-d", "in.shr"]).unwrap();
        assert_eq!(args.max_output, DEFAULT_MAX_OUTPUT);
        assert_eq!(args.output_path(), PathBuf::from("in.shr.out"));

        let args = Args::try_parse_from(["shrinkr", "-d", "-m", "4096", "in.shr"]).unwrap();
        assert_eq!(args.max_output, 4096);
    }

    #[test]
    fn test_overrides_apply_to_preset() {
        let args =
            Args::try_parse_from(["shrinkr", "--preset", "fast", "-i", "3", "--no-parity", "x"])
                .unwrap();
        let options = args.pack_options();
        assert_eq!(options.iterations, 3);
        assert_eq!(options.skip_length, PackOptions::fast().skip_length);
        assert!(!options.parity_context);
        assert_eq!(args.output_path(), PathBuf::from("x.shr"));
    }
}
