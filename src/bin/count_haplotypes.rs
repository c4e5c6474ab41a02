use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use varhap::cli;
use varhap::haplotype::{self, CallerConfig, GroupedCaller};
use varhap::sam::AlignmentRecord;

#[derive(Parser)]
#[command(
    name = "count_haplotypes",
    about = "Infer linked haplotypes at query sites from co-named read groups"
)]
struct Cli {
    /// SAM-format file of reads, sorted so read pairs are adjacent
    #[arg(short = 's', long = "sam")]
    sam: PathBuf,

    /// Ordered list of 1-indexed sites of interest, one per line
    #[arg(short = 'i', long = "sites")]
    sites: PathBuf,

    /// Name of the chromosome of interest
    #[arg(short = 'c', long = "chromosome")]
    chromosome: String,

    /// Output list of haplotypes, one per line
    #[arg(short = 'o', long = "out")]
    out: PathBuf,

    /// Minimum base quality for a base to be tallied
    #[arg(short = 'Q', long = "base-quality", default_value_t = 20,
          value_parser = clap::value_parser!(i64).range(0..=40))]
    base_quality: i64,

    /// Minimum mapping quality for a read to be tallied
    #[arg(short = 'q', long = "map-quality", default_value_t = 20)]
    map_quality: i64,

    /// Print a header line with the query sites
    #[arg(short = 'H', long = "header")]
    header: bool,
}

fn main() -> Result<()> {
    let start = Instant::now();
    let cli_args = Cli::parse();

    cli::banner("Count Haplotypes");

    cli::section("Configuration");
    cli::kv("SAM file", &cli_args.sam.display().to_string());
    cli::kv("Query sites", &cli_args.sites.display().to_string());
    cli::kv("Chromosome", &cli_args.chromosome);
    cli::kv("Output", &cli_args.out.display().to_string());
    cli::kv("Base quality", &cli_args.base_quality.to_string());
    cli::kv("Mapping quality", &cli_args.map_quality.to_string());
    cli::kv("Header", &cli_args.header.to_string());
    eprintln!();

    cli::section("Loading");
    let sites_file = File::open(&cli_args.sites)
        .with_context(|| format!("failed to open query file: {}", cli_args.sites.display()))?;
    let sites = haplotype::read_query_sites(BufReader::new(sites_file))?;
    cli::kv("Query sites", &format!("{}", sites.len()));
    eprintln!();

    let config = CallerConfig {
        chromosome: cli_args.chromosome.clone(),
        base_quality: cli_args.base_quality,
        map_quality: cli_args.map_quality,
    };

    cli::section("Calling");
    let sam = File::open(&cli_args.sam)
        .with_context(|| format!("failed to open SAM file: {}", cli_args.sam.display()))?;
    let mut out = BufWriter::new(File::create(&cli_args.out).with_context(|| {
        format!("failed to create output file: {}", cli_args.out.display())
    })?);

    if cli_args.header {
        writeln!(out, "{}", haplotype::format_header(&sites))?;
    }

    let mut caller = GroupedCaller::new(&config, &sites);
    let mut haplotypes = 0u64;
    for line in BufReader::new(sam).lines() {
        let line = line?;
        let record = AlignmentRecord::parse(&line)?;
        if let Some(row) = caller.push(record)? {
            writeln!(out, "{}", haplotype::format_row(&row))?;
            haplotypes += 1;
        }
    }
    if let Some(row) = caller.finish()? {
        writeln!(out, "{}", haplotype::format_row(&row))?;
        haplotypes += 1;
    }
    out.flush()?;

    cli::success(&format!("{haplotypes} haplotypes written"));
    cli::print_summary(start);
    Ok(())
}
