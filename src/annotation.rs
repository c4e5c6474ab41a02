//! Gene-model annotations loaded from a BED12 table.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::Error;
use crate::strand::Strand;
use crate::text::split_fields;

/// One forward-strand gene model.
///
/// Coordinates are zero-indexed and half-open. Exon start offsets are
/// relative to `chrom_start`, listed in transcript order, and paired
/// one-to-one with `exon_sizes`.
#[derive(Debug, Clone)]
pub struct GeneAnnotation {
    pub chromosome: String,
    pub chrom_start: i64,
    pub chrom_end: i64,
    pub name: String,
    pub exon_sizes: Vec<i64>,
    pub exon_starts: Vec<i64>,
}

impl GeneAnnotation {
    /// Total length of the concatenated exons (the intron-free gene).
    #[must_use]
    pub fn gene_len(&self) -> i64 {
        self.exon_sizes.iter().sum()
    }
}

/// Loads gene models from a BED12 file.
///
/// Rejects rows with fewer than 12 tab-delimited fields and rows on the
/// reverse strand. Annotation tables are small; callers scan them linearly.
pub fn load_bed(path: &Path) -> Result<Vec<GeneAnnotation>, Error> {
    let file = File::open(path)?;
    parse_bed(BufReader::new(file))
}

/// Parses BED12 rows from a buffered reader.
pub fn parse_bed<R: BufRead>(reader: R) -> Result<Vec<GeneAnnotation>, Error> {
    let mut annotations = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let fields = split_fields(&line, '\t');
        if fields.len() < 12 {
            return Err(Error::Parse(format!(
                "BED row has {} fields, expected at least 12: {line}",
                fields.len()
            )));
        }

        if Strand::from_bed(fields[5]).is_reverse() {
            return Err(Error::Validation(format!(
                "negative-sense gene models are not supported: {}",
                fields[3]
            )));
        }

        let num_exons: usize = parse_int(fields[9], "exon count")? as usize;
        let exon_sizes = parse_int_list(fields[10], num_exons, "exon sizes")?;
        let exon_starts = parse_int_list(fields[11], num_exons, "exon starts")?;

        annotations.push(GeneAnnotation {
            chromosome: fields[0].to_string(),
            chrom_start: parse_int(fields[1], "chromStart")?,
            chrom_end: parse_int(fields[2], "chromEnd")?,
            name: fields[3].to_string(),
            exon_sizes,
            exon_starts,
        });
    }

    Ok(annotations)
}

fn parse_int(s: &str, what: &str) -> Result<i64, Error> {
    s.parse()
        .map_err(|_| Error::Parse(format!("invalid {what} in BED row: '{s}'")))
}

fn parse_int_list(s: &str, n: usize, what: &str) -> Result<Vec<i64>, Error> {
    let values: Vec<i64> = split_fields(s, ',')
        .into_iter()
        .take(n)
        .map(|v| parse_int(v, what))
        .collect::<Result<_, _>>()?;
    if values.len() < n {
        return Err(Error::Parse(format!(
            "{what} list has {} entries, expected {n}",
            values.len()
        )));
    }
    Ok(values)
}
