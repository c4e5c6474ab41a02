//! Mapping between gene-local (exon-concatenated) and chromosome coordinates.
//!
//! Gene-local positions index the intron-free coding sequence formed by
//! concatenating a model's exons in transcript order. All positions are
//! zero-indexed.

use crate::annotation::GeneAnnotation;

/// Maps a gene-local position to its chromosome position.
///
/// Walks the exon list in order, accumulating a gene-local counter; the exon
/// whose cumulative range contains `gene_pos` determines the chromosome
/// position. Returns `None` when `gene_pos` lies beyond the concatenated
/// exons.
#[must_use]
pub fn gene_to_chromosome(gene_pos: i64, ann: &GeneAnnotation) -> Option<i64> {
    let mut counter = 0;
    for (i, &size) in ann.exon_sizes.iter().enumerate() {
        if gene_pos >= counter && gene_pos < counter + size {
            return Some(ann.chrom_start + ann.exon_starts[i] + (gene_pos - counter));
        }
        counter += size;
    }
    None
}

/// Finds the exon containing a chromosome position, if any.
///
/// The chromosome range `[chrom_start, chrom_end)` is checked first as a
/// fast pre-filter; exons never overlap, so the first hit is the only one.
#[must_use]
pub fn exon_containing(chrom_pos: i64, ann: &GeneAnnotation) -> Option<usize> {
    if chrom_pos < ann.chrom_start || chrom_pos >= ann.chrom_end {
        return None;
    }
    ann.exon_sizes
        .iter()
        .zip(&ann.exon_starts)
        .position(|(&size, &start)| {
            let exon_start = ann.chrom_start + start;
            chrom_pos >= exon_start && chrom_pos < exon_start + size
        })
}

/// Maps a chromosome position inside exon `exon_index` to its gene-local
/// position.
#[must_use]
pub fn chromosome_to_gene(chrom_pos: i64, exon_index: usize, ann: &GeneAnnotation) -> i64 {
    let upstream: i64 = ann.exon_sizes[..exon_index].iter().sum();
    chrom_pos - ann.exon_starts[exon_index] - ann.chrom_start + upstream
}

/// Codon geometry for a gene-local position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodonSpan {
    /// Zero-indexed codon number (`gene_pos / 3`).
    pub number: i64,
    /// Offset of the position within its codon (`gene_pos % 3`).
    pub offset: usize,
    /// Chromosome positions of the codon's three bases, in codon order.
    pub chrom_positions: [i64; 3],
}

/// Locates the codon containing `gene_pos` on the chromosome.
///
/// Each of the three bases is mapped independently, so a codon that spans
/// an exon boundary needs no special casing. Returns `None` when any base
/// falls outside the concatenated exons (a truncated trailing codon).
#[must_use]
pub fn codon_span(gene_pos: i64, ann: &GeneAnnotation) -> Option<CodonSpan> {
    let number = gene_pos / 3;
    let offset = (gene_pos % 3) as usize;
    let codon_start = gene_pos - offset as i64;

    let mut chrom_positions = [0i64; 3];
    for (i, slot) in chrom_positions.iter_mut().enumerate() {
        *slot = gene_to_chromosome(codon_start + i as i64, ann)?;
    }

    Some(CodonSpan {
        number,
        offset,
        chrom_positions,
    })
}
