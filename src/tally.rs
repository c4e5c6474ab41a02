//! Per-position base-call tallies, coverage summary, and consensus calling.

use std::io::Write;

use crate::cigar::CigarOp;
use crate::error::Error;
use crate::fasta::{self, FastaRecord};
use crate::sam::AlignmentRecord;

/// Bases tallied at every reference position, in output order.
pub const TALLY_BASES: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// Sequence length after which consensus FASTA lines wrap.
const FASTA_WIDTH: usize = 70;

/// Running statistics for one (reference, position, base) cell.
///
/// Totals accumulate across the whole read stream; means are computed only
/// at output time.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionBaseStat {
    pub count: u64,
    pub total_quality: i64,
    /// Sum of one-indexed, orientation-adjusted read positions.
    pub total_read_position: i64,
}

impl PositionBaseStat {
    fn mean_quality(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_quality as f64 / self.count as f64
        }
    }

    fn mean_read_position(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_read_position as f64 / self.count as f64
        }
    }
}

/// Thresholds and trims for the tally.
#[derive(Debug, Clone)]
pub struct TallyConfig {
    /// A base is tallied only when its decoded quality exceeds this.
    pub base_quality: i64,
    /// A record is tallied only when its mapping quality exceeds this.
    pub map_quality: i64,
    /// Bases trimmed from the 5' end of each read, after soft clipping.
    pub left_trim: usize,
    /// Bases trimmed from the 3' end of each read, after soft clipping.
    pub right_trim: usize,
}

/// Base tallies over a set of reference sequences.
///
/// Cells are pre-allocated for every reference position and the four
/// bases, so uncovered positions still emit zero rows. This is the only
/// long-lived mutable structure in the tally pipeline; it grows bounded by
/// reference length times four.
pub struct BaseTally {
    /// Indexed `[reference][position][base index in TALLY_BASES]`.
    stats: Vec<Vec<[PositionBaseStat; 4]>>,
    /// Reads skipped because their CIGAR carried indel operations.
    pub indel_reads: u64,
}

fn base_index(base: u8) -> Option<usize> {
    TALLY_BASES.iter().position(|&b| b == base)
}

impl BaseTally {
    /// Allocates zeroed cells for every position of every reference.
    #[must_use]
    pub fn new(references: &[FastaRecord]) -> Self {
        Self {
            stats: references
                .iter()
                .map(|r| vec![[PositionBaseStat::default(); 4]; r.sequence.len()])
                .collect(),
            indel_reads: 0,
        }
    }

    /// Folds one alignment record into the tally.
    ///
    /// Unmapped, secondary, unknown-chromosome, and low-mapping-quality
    /// records are skipped silently; indel-bearing records are skipped and
    /// counted in `indel_reads`. Only the CIGAR/sequence length mismatch is
    /// fatal.
    pub fn add_record(
        &mut self,
        record: &AlignmentRecord,
        references: &[FastaRecord],
        config: &TallyConfig,
    ) -> Result<(), Error> {
        if record.is_unmapped() || record.is_secondary() {
            return Ok(());
        }

        let expanded = record.expanded_cigar()?;

        if record.contains_indel() {
            self.indel_reads += 1;
            return Ok(());
        }

        let Some(ref_index) = fasta::index_of(references, &record.chromosome) else {
            return Ok(());
        };
        if record.map_quality <= config.map_quality {
            return Ok(());
        }

        let len = record.sequence.len();
        let left_clip = expanded
            .iter()
            .take_while(|t| **t == CigarOp::SoftClip)
            .count();
        let right_clip = expanded
            .iter()
            .rev()
            .take_while(|t| **t == CigarOp::SoftClip)
            .count();
        let keep_from = left_clip + config.left_trim;
        let keep_to = len.saturating_sub(right_clip + config.right_trim);

        let positions = &mut self.stats[ref_index];
        let mut aligned = 0i64;
        for (i, tag) in expanded.iter().enumerate() {
            if !tag.is_aligned() {
                continue;
            }
            let ref_pos = record.position + aligned;
            aligned += 1;

            if record.base_quality(i) <= config.base_quality || i < keep_from || i >= keep_to
            {
                continue;
            }
            let Ok(pos) = usize::try_from(ref_pos) else {
                continue;
            };
            // Alignments running past the reference end are dropped base by
            // base rather than failing the run.
            let Some(cell) = positions.get_mut(pos) else {
                continue;
            };
            let Some(b) = base_index(record.sequence[i]) else {
                continue;
            };

            cell[b].count += 1;
            cell[b].total_quality += record.base_quality(i);
            cell[b].total_read_position += if record.template_length >= 0 {
                i as i64 + 1
            } else {
                (len - (i + 1)) as i64
            };
        }

        Ok(())
    }

    /// Statistics cell for a (reference index, position, base) triple.
    #[must_use]
    pub fn stat(&self, ref_index: usize, pos: usize, base: u8) -> Option<&PositionBaseStat> {
        let b = base_index(base)?;
        self.stats.get(ref_index)?.get(pos).map(|cell| &cell[b])
    }

    /// Writes the per-position summary.
    ///
    /// One tab-terminated row per (reference, position, base) in reference
    /// file order: name, one-indexed position, base, reference base,
    /// one-indexed genomic position concatenated across references, count,
    /// mean quality, mean read position. Zero-count cells report `0` means.
    pub fn write_summary<W: Write>(
        &self,
        references: &[FastaRecord],
        mut out: W,
    ) -> Result<(), Error> {
        let mut genomic_position: u64 = 0;
        for (ref_index, reference) in references.iter().enumerate() {
            for (pos, cell) in self.stats[ref_index].iter().enumerate() {
                genomic_position += 1;
                for (b, &base) in TALLY_BASES.iter().enumerate() {
                    let stat = &cell[b];
                    writeln!(
                        out,
                        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t",
                        reference.name,
                        pos + 1,
                        base as char,
                        reference.sequence[pos] as char,
                        genomic_position,
                        stat.count,
                        stat.mean_quality(),
                        stat.mean_read_position()
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Writes the majority-vote consensus FASTA.
    ///
    /// Each position takes the base with the strictly highest count,
    /// comparing in `TALLY_BASES` order against an `N` baseline of zero, so
    /// ties keep the earlier winner and uncovered positions stay `N`.
    /// Sequences wrap every 70 bases.
    pub fn write_consensus<W: Write>(
        &self,
        references: &[FastaRecord],
        mut out: W,
    ) -> Result<(), Error> {
        for (ref_index, reference) in references.iter().enumerate() {
            writeln!(out, ">{}", reference.name)?;
            for (pos, cell) in self.stats[ref_index].iter().enumerate() {
                let mut max_base = b'N';
                let mut max_count = 0u64;
                for (b, &base) in TALLY_BASES.iter().enumerate() {
                    if cell[b].count > max_count {
                        max_count = cell[b].count;
                        max_base = base;
                    }
                }
                out.write_all(&[max_base])?;
                if (pos + 1) % FASTA_WIDTH == 0 {
                    writeln!(out)?;
                }
            }
            writeln!(out)?;
        }
        Ok(())
    }
}
