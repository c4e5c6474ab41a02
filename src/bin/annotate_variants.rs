use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use varhap::annotate::{self, Variant};
use varhap::annotation;
use varhap::cli;
use varhap::codon::CodonTable;
use varhap::fasta;

#[derive(Parser)]
#[command(
    name = "annotate_variants",
    about = "Annotate point variants with codon and synonymy information"
)]
struct Cli {
    /// Tab-delimited variant file in the form chr, pos, base, refbase
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// FASTA format reference sequence
    #[arg(short = 'f', long = "fasta")]
    fasta: PathBuf,

    /// BED format gene-model annotation for the reference
    #[arg(short = 'b', long = "bed")]
    bed: PathBuf,

    /// Output tab-delimited variant file
    #[arg(short = 'o', long = "out")]
    out: PathBuf,
}

fn main() -> Result<()> {
    let start = Instant::now();
    let cli_args = Cli::parse();

    cli::banner("Annotate Variants");

    cli::section("Configuration");
    cli::kv("Variants", &cli_args.input.display().to_string());
    cli::kv("Reference", &cli_args.fasta.display().to_string());
    cli::kv("Annotation", &cli_args.bed.display().to_string());
    cli::kv("Output", &cli_args.out.display().to_string());
    eprintln!();

    cli::section("Loading");
    let references = fasta::read_file(&cli_args.fasta)
        .with_context(|| format!("failed to read reference: {}", cli_args.fasta.display()))?;
    cli::kv("Reference", &format!("{} sequences", references.len()));

    let annotations = annotation::load_bed(&cli_args.bed)
        .with_context(|| format!("failed to read annotation: {}", cli_args.bed.display()))?;
    cli::kv("Annotation", &format!("{} gene models", annotations.len()));

    let table = CodonTable::standard();
    eprintln!();

    cli::section("Annotating");
    let input = File::open(&cli_args.input)
        .with_context(|| format!("failed to open variant file: {}", cli_args.input.display()))?;
    let mut out = BufWriter::new(File::create(&cli_args.out).with_context(|| {
        format!("failed to create output file: {}", cli_args.out.display())
    })?);

    let mut variants = 0u64;
    let mut rows = 0u64;
    for line in BufReader::new(input).lines() {
        let line = line?;
        let variant = Variant::parse(&line)?;
        let result = annotate::annotate(&variant, &annotations, &references, &table)?;

        if result.is_empty() {
            writeln!(out, "{}", annotate::format_row(&line, None))?;
            rows += 1;
        } else {
            for codon_annotation in &result {
                writeln!(out, "{}", annotate::format_row(&line, Some(codon_annotation)))?;
                rows += 1;
            }
        }
        variants += 1;
    }
    out.flush()?;

    cli::success(&format!("{variants} variants annotated ({rows} output rows)"));
    cli::print_summary(start);
    Ok(())
}
