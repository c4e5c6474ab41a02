//! SAM alignment-record parsing.

use crate::cigar::{self, CigarOp};
use crate::error::Error;
use crate::text::split_fields;

/// Offset subtracted from quality-string bytes to recover Phred scores.
const PHRED_OFFSET: u8 = 33;

/// Flag values above this mark secondary alignments.
const SECONDARY_FLAG: i64 = 256;

/// One parsed SAM body line.
///
/// `position` is zero-indexed (converted from the one-indexed source).
/// `template_length` is signed; a negative value marks a reverse-oriented
/// read. Records are parsed per line and consumed immediately.
#[derive(Debug, Clone)]
pub struct AlignmentRecord {
    pub query_name: String,
    pub flag: i64,
    pub chromosome: String,
    pub position: i64,
    pub map_quality: i64,
    pub cigar: String,
    pub template_length: i64,
    pub sequence: Vec<u8>,
    pub quality: Vec<u8>,
}

impl AlignmentRecord {
    /// Parses one tab-delimited SAM body line.
    pub fn parse(line: &str) -> Result<Self, Error> {
        let fields = split_fields(line, '\t');
        if fields.len() < 11 {
            return Err(Error::Parse(format!(
                "SAM line has {} fields, expected at least 11",
                fields.len()
            )));
        }

        let sequence = fields[9].as_bytes().to_vec();
        let quality = fields[10].as_bytes().to_vec();
        if quality.len() != sequence.len() {
            return Err(Error::Parse(format!(
                "read '{}' has {} sequence bases but {} quality values",
                fields[0],
                sequence.len(),
                quality.len()
            )));
        }

        Ok(Self {
            query_name: fields[0].to_string(),
            flag: parse_int(fields[1], "FLAG")?,
            chromosome: fields[2].to_string(),
            position: parse_int(fields[3], "POS")? - 1,
            map_quality: parse_int(fields[4], "MAPQ")?,
            cigar: fields[5].to_string(),
            template_length: parse_int(fields[8], "TLEN")?,
            sequence,
            quality,
        })
    }

    /// True when the record did not map (`*` CIGAR).
    #[must_use]
    pub fn is_unmapped(&self) -> bool {
        self.cigar == "*"
    }

    /// True for secondary alignments.
    #[must_use]
    pub fn is_secondary(&self) -> bool {
        self.flag > SECONDARY_FLAG
    }

    /// True when the compact CIGAR carries an insertion, deletion, or
    /// padding operation.
    #[must_use]
    pub fn contains_indel(&self) -> bool {
        cigar::contains_indel(&self.cigar)
    }

    /// Expands the CIGAR to one tag per base, checking it against the
    /// sequence length. A mismatch is a fatal format violation for the
    /// record stream.
    pub fn expanded_cigar(&self) -> Result<Vec<CigarOp>, Error> {
        let expanded = cigar::expand(&self.cigar);
        if expanded.len() != self.sequence.len() {
            return Err(Error::Consistency(format!(
                "CIGAR '{}' expands to {} bases but read '{}' has {}",
                self.cigar,
                expanded.len(),
                self.query_name,
                self.sequence.len()
            )));
        }
        Ok(expanded)
    }

    /// Decoded Phred quality score for the base at `i`.
    #[must_use]
    pub fn base_quality(&self, i: usize) -> i64 {
        i64::from(self.quality[i].saturating_sub(PHRED_OFFSET))
    }
}

fn parse_int(s: &str, what: &str) -> Result<i64, Error> {
    s.parse()
        .map_err(|_| Error::Parse(format!("invalid {what} field in SAM line: '{s}'")))
}
