//! Codon-level annotation of point variants against gene models.

use crate::annotation::GeneAnnotation;
use crate::codon::CodonTable;
use crate::error::Error;
use crate::fasta::FastaRecord;
use crate::genemap;
use crate::text::split_fields;

/// A point variant read from one input line.
///
/// Input lines carry `chromosome, position (one-indexed), alt base, ref
/// base` in their first four tab-delimited fields; the stored position is
/// zero-indexed.
#[derive(Debug, Clone)]
pub struct Variant {
    pub chromosome: String,
    pub position: i64,
    pub alt_base: u8,
    pub ref_base: u8,
}

impl Variant {
    /// Parses the leading fields of a variant line. Extra fields are
    /// allowed and preserved by echoing the whole line on output.
    pub fn parse(line: &str) -> Result<Self, Error> {
        let fields = split_fields(line, '\t');
        if fields.len() < 4 {
            return Err(Error::Parse(
                "variant file does not contain sufficient fields".to_string(),
            ));
        }
        let position: i64 = fields[1].parse().map_err(|_| {
            Error::Parse(format!("invalid variant position: '{}'", fields[1]))
        })?;
        Ok(Self {
            chromosome: fields[0].to_string(),
            position: position - 1,
            alt_base: fields[2].as_bytes()[0],
            ref_base: fields[3].as_bytes()[0],
        })
    }
}

/// Codon-level annotation of one variant against one gene model.
#[derive(Debug, Clone)]
pub struct CodonAnnotation {
    pub gene: String,
    /// Zero-indexed codon number; rendered one-indexed.
    pub codon_number: i64,
    pub ref_aa: u8,
    pub alt_aa: u8,
    pub synonymous: bool,
    pub fourfold_synonymous: bool,
}

/// Outcome for one variant line: one entry per matching gene model, or
/// empty when no model contains the variant.
pub type AnnotationResult = Vec<CodonAnnotation>;

/// Annotates a variant against every gene model.
///
/// A variant inside overlapping reading frames matches several models and
/// yields one annotation per match, each computed independently.
pub fn annotate(
    variant: &Variant,
    annotations: &[GeneAnnotation],
    references: &[FastaRecord],
    table: &CodonTable,
) -> Result<AnnotationResult, Error> {
    let mut results = Vec::new();

    for ann in annotations {
        if variant.chromosome != ann.chromosome {
            continue;
        }
        let Some(exon) = genemap::exon_containing(variant.position, ann) else {
            continue;
        };
        let gene_pos = genemap::chromosome_to_gene(variant.position, exon, ann);
        results.push(annotate_in_gene(variant, gene_pos, ann, references, table)?);
    }

    Ok(results)
}

fn annotate_in_gene(
    variant: &Variant,
    gene_pos: i64,
    ann: &GeneAnnotation,
    references: &[FastaRecord],
    table: &CodonTable,
) -> Result<CodonAnnotation, Error> {
    let span = genemap::codon_span(gene_pos, ann).ok_or_else(|| {
        Error::Consistency(format!(
            "codon for gene position {gene_pos} of {} extends past the gene",
            ann.name
        ))
    })?;

    // A variant on a chromosome absent from the reference keeps the NNN
    // placeholder codon and translates to the invalid marker downstream.
    let mut ref_codon = [b'N'; 3];
    if let Some(record) = references.iter().find(|r| r.name == variant.chromosome) {
        // The codon is read base-by-base so one spanning two exons picks up
        // the right bases on both sides of the intron.
        for (slot, &chrom_pos) in ref_codon.iter_mut().zip(&span.chrom_positions) {
            *slot = reference_base(record, chrom_pos)?;
        }

        let at_variant = reference_base(record, variant.position)?;

        // Re-derive the variant base through the mapper; disagreement means
        // the annotation table and reference are out of step.
        let remapped = genemap::gene_to_chromosome(gene_pos, ann)
            .map(|p| reference_base(record, p))
            .transpose()?;
        if remapped != Some(at_variant) {
            return Err(Error::Consistency(format!(
                "annotation {} maps gene position {gene_pos} away from \
                 chromosome position {}",
                ann.name, variant.position
            )));
        }

        if at_variant != variant.ref_base {
            return Err(Error::Consistency(format!(
                "invalid reference base at position {}: variant file says \
                 '{}', reference has '{}'",
                variant.position,
                variant.ref_base as char,
                at_variant as char
            )));
        }
    }

    let ref_aa = table.translate(&ref_codon);
    let mut alt_codon = ref_codon;
    alt_codon[span.offset] = variant.alt_base;
    let alt_aa = table.translate(&alt_codon);

    Ok(CodonAnnotation {
        gene: ann.name.clone(),
        codon_number: span.number,
        ref_aa,
        alt_aa,
        synonymous: ref_aa == alt_aa,
        fourfold_synonymous: table.is_fourfold_degenerate(&ref_codon, span.offset),
    })
}

fn reference_base(record: &FastaRecord, chrom_pos: i64) -> Result<u8, Error> {
    usize::try_from(chrom_pos)
        .ok()
        .and_then(|p| record.sequence.get(p).copied())
        .ok_or_else(|| {
            Error::Consistency(format!(
                "position {chrom_pos} is outside reference '{}' ({} bases)",
                record.name,
                record.sequence.len()
            ))
        })
}

/// Renders one output row: the input line echoed, then the annotation
/// fields. An unannotated variant keeps the sentinel column values the
/// downstream tooling expects (`none`, codon 0, `Z`, `-1`).
#[must_use]
pub fn format_row(line: &str, annotation: Option<&CodonAnnotation>) -> String {
    match annotation {
        Some(a) => format!(
            "{line}\t{}\t{}\t{}\t{}\t{}\t{}",
            a.gene,
            a.codon_number + 1,
            a.ref_aa as char,
            a.alt_aa as char,
            i32::from(a.synonymous),
            i32::from(a.fourfold_synonymous)
        ),
        None => format!("{line}\tnone\t0\tZ\tZ\t-1\t-1"),
    }
}
