//! Per-base CIGAR expansion.

use std::fmt;

/// Per-base alignment operation, one tag per sequence base.
///
/// Only the operations that consume sequence bases appear in an expansion;
/// `D`, `N`, `H`, and `P` contribute no tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CigarOp {
    Match,
    Insertion,
    SoftClip,
    Equal,
    Mismatch,
}

impl CigarOp {
    /// True for tags that advance the reference position in the base tally
    /// (everything aligned to the reference, including `=` and `X`).
    #[must_use]
    pub fn is_aligned(self) -> bool {
        !matches!(self, Self::Insertion | Self::SoftClip)
    }
}

impl fmt::Display for CigarOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Self::Match => 'M',
            Self::Insertion => 'I',
            Self::SoftClip => 'S',
            Self::Equal => '=',
            Self::Mismatch => 'X',
        };
        write!(f, "{c}")
    }
}

/// Expands a run-length CIGAR string into one tag per sequence base.
///
/// `"1S5M4S"` expands to `S M M M M M S S S S`. Operations `D`, `N`, `H`,
/// and `P` consume their pending run length and emit nothing. Characters
/// outside `MIDNSHP=X` are accumulated as run-length digits without
/// validation; a malformed run simply contributes zero bases.
#[must_use]
pub fn expand(cigar: &str) -> Vec<CigarOp> {
    let mut expanded = Vec::with_capacity(cigar.len());
    let mut run = String::new();

    for c in cigar.chars() {
        let op = match c {
            'M' => Some(CigarOp::Match),
            'I' => Some(CigarOp::Insertion),
            'S' => Some(CigarOp::SoftClip),
            '=' => Some(CigarOp::Equal),
            'X' => Some(CigarOp::Mismatch),
            'D' | 'N' | 'H' | 'P' => None,
            _ => {
                run.push(c);
                continue;
            }
        };
        if let Some(op) = op {
            let n: usize = run.parse().unwrap_or(0);
            expanded.extend(std::iter::repeat(op).take(n));
        }
        run.clear();
    }

    expanded
}

/// True if the compact CIGAR string contains an insertion, deletion, or
/// padding operation. Reads carrying these are excluded from tallies and
/// haplotypes rather than realigned.
#[must_use]
pub fn contains_indel(cigar: &str) -> bool {
    cigar.chars().any(|c| matches!(c, 'I' | 'D' | 'P'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::CigarOp::{Insertion, Match, Mismatch, SoftClip};

    fn tags(cigar: &str) -> String {
        expand(cigar).iter().map(ToString::to_string).collect()
    }

    #[test]
    fn soft_clipped_read() {
        assert_eq!(tags("1S5M4S"), "SMMMMMSSSS");
    }

    #[test]
    fn plain_match() {
        assert_eq!(expand("3M"), vec![Match, Match, Match]);
    }

    #[test]
    fn deletion_consumes_no_bases() {
        // 2M3D2M covers 7 reference bases but only 4 sequence bases.
        assert_eq!(tags("2M3D2M"), "MMMM");
    }

    #[test]
    fn skip_and_hard_clip_consume_no_bases() {
        assert_eq!(tags("2H3M100N3M2H"), "MMMMMM");
    }

    #[test]
    fn insertion_and_extended_ops() {
        assert_eq!(
            expand("1=1X1I"),
            vec![CigarOp::Equal, Mismatch, Insertion]
        );
    }

    #[test]
    fn multi_digit_runs() {
        assert_eq!(expand("12M").len(), 12);
        assert_eq!(expand("103M2S").len(), 105);
    }

    #[test]
    fn expanded_length_matches_consuming_runs() {
        // D and H runs do not count toward the sequence length.
        assert_eq!(expand("5S10M2D8M1I4S").len(), 5 + 10 + 8 + 1 + 4);
    }

    #[test]
    fn unmapped_star_expands_empty() {
        assert!(expand("*").is_empty());
    }

    #[test]
    fn unknown_characters_treated_as_digits() {
        // A stray character invalidates its run, contributing zero bases.
        assert_eq!(tags("1?M3M"), "MMM");
    }

    #[test]
    fn indel_detection() {
        assert!(contains_indel("3M1I3M"));
        assert!(contains_indel("3M1D3M"));
        assert!(contains_indel("3M1P3M"));
        assert!(!contains_indel("5S90M5S"));
        assert!(!contains_indel("10M100N10M"));
    }

    #[test]
    fn aligned_classification() {
        assert!(Match.is_aligned());
        assert!(CigarOp::Equal.is_aligned());
        assert!(Mismatch.is_aligned());
        assert!(!Insertion.is_aligned());
        assert!(!SoftClip.is_aligned());
    }
}
