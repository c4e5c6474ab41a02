use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use varhap::cli;
use varhap::fasta;
use varhap::sam::AlignmentRecord;
use varhap::tally::{BaseTally, TallyConfig};

#[derive(Parser)]
#[command(
    name = "tally_bases",
    about = "Tally per-position base calls from aligned reads into a coverage summary"
)]
struct Cli {
    /// SAM-format file of aligned reads
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// FASTA format reference sequence
    #[arg(short = 'f', long = "fasta")]
    fasta: PathBuf,

    /// Output per-position summary file
    #[arg(short = 'o', long = "out")]
    out: PathBuf,

    /// Write the consensus sequence of the alignment to FILE
    #[arg(short = 's', long = "consensus")]
    consensus: Option<PathBuf>,

    /// Minimum base quality for a base to be tallied
    #[arg(short = 'Q', long = "base-quality", default_value_t = 20,
          value_parser = clap::value_parser!(i64).range(0..=40))]
    base_quality: i64,

    /// Minimum mapping quality for a read to be tallied
    #[arg(short = 'q', long = "map-quality", default_value_t = 20)]
    map_quality: i64,

    /// Bases to trim from the 5' (left) end of each read, after soft clipping
    #[arg(short = 'l', long = "left-trim", default_value_t = 0)]
    left_trim: usize,

    /// Bases to trim from the 3' (right) end of each read, after soft clipping
    #[arg(short = 'r', long = "right-trim", default_value_t = 0)]
    right_trim: usize,
}

fn main() -> Result<()> {
    let start = Instant::now();
    let cli_args = Cli::parse();

    cli::banner("Tally Bases");

    cli::section("Configuration");
    cli::kv("SAM file", &cli_args.input.display().to_string());
    cli::kv("Reference", &cli_args.fasta.display().to_string());
    cli::kv("Output", &cli_args.out.display().to_string());
    if let Some(consensus) = &cli_args.consensus {
        cli::kv("Consensus", &consensus.display().to_string());
    }
    cli::kv("Base quality", &cli_args.base_quality.to_string());
    cli::kv("Mapping quality", &cli_args.map_quality.to_string());
    cli::kv("Left trim", &cli_args.left_trim.to_string());
    cli::kv("Right trim", &cli_args.right_trim.to_string());
    eprintln!();

    cli::section("Loading");
    let references = fasta::read_file(&cli_args.fasta)
        .with_context(|| format!("failed to read reference: {}", cli_args.fasta.display()))?;
    cli::kv("Reference", &format!("{} sequences", references.len()));
    eprintln!();

    let config = TallyConfig {
        base_quality: cli_args.base_quality,
        map_quality: cli_args.map_quality,
        left_trim: cli_args.left_trim,
        right_trim: cli_args.right_trim,
    };

    cli::section("Tallying");
    let sam = File::open(&cli_args.input)
        .with_context(|| format!("failed to open SAM file: {}", cli_args.input.display()))?;

    let mut tally = BaseTally::new(&references);
    let mut records = 0u64;
    for line in BufReader::new(sam).lines() {
        let line = line?;
        let record = AlignmentRecord::parse(&line)?;
        tally.add_record(&record, &references, &config)?;
        records += 1;
    }
    cli::kv("Records", &records.to_string());
    if tally.indel_reads > 0 {
        cli::warning(&format!(
            "{} reads containing indels were not counted",
            tally.indel_reads
        ));
    }
    eprintln!();

    cli::section("Writing");
    let out = BufWriter::new(File::create(&cli_args.out).with_context(|| {
        format!("failed to create output file: {}", cli_args.out.display())
    })?);
    tally.write_summary(&references, out)?;
    cli::success("base frequency summary written");

    if let Some(consensus_path) = &cli_args.consensus {
        let out = BufWriter::new(File::create(consensus_path).with_context(|| {
            format!("failed to create consensus file: {}", consensus_path.display())
        })?);
        tally.write_consensus(&references, out)?;
        cli::success("consensus sequence written");
    }

    cli::print_summary(start);
    Ok(())
}
