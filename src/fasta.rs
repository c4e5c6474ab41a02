//! Parser for multi-FASTA reference files.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::Error;

/// A single reference sequence with its header name.
#[derive(Debug, Clone)]
pub struct FastaRecord {
    /// First whitespace-delimited token of the header, `>` stripped.
    pub name: String,
    /// Concatenated sequence lines, bytes kept verbatim.
    pub sequence: Vec<u8>,
}

/// Reads a multi-FASTA file, decompressing when the path ends in `.gz`.
///
/// Record order follows file order; downstream consumers (the tally
/// summarizer's genomic-position counter, consensus output) depend on it.
pub fn read_file(path: &Path) -> Result<Vec<FastaRecord>, Error> {
    let file = File::open(path)?;
    if path.extension().is_some_and(|e| e == "gz") {
        parse(BufReader::new(GzDecoder::new(file)))
    } else {
        parse(BufReader::new(file))
    }
}

/// Reads multi-FASTA from a buffered reader.
pub fn parse<R: BufRead>(reader: R) -> Result<Vec<FastaRecord>, Error> {
    let mut records: Vec<FastaRecord> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if let Some(header) = line.strip_prefix('>') {
            let name = header.split_whitespace().next().unwrap_or("");
            if name.is_empty() {
                return Err(Error::Parse(format!("empty FASTA header: >{header}")));
            }
            records.push(FastaRecord {
                name: name.to_string(),
                sequence: Vec::new(),
            });
        } else if let Some(record) = records.last_mut() {
            record.sequence.extend_from_slice(line.trim_end().as_bytes());
        }
    }

    Ok(records)
}

/// Finds the index of a reference sequence by name.
#[must_use]
pub fn index_of(records: &[FastaRecord], name: &str) -> Option<usize> {
    records.iter().position(|r| r.name == name)
}

/// Reads gzip-compressed multi-FASTA from any reader.
pub fn parse_gz<R: Read>(reader: R) -> Result<Vec<FastaRecord>, Error> {
    parse(BufReader::new(GzDecoder::new(reader)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    #[test]
    fn parse_single_sequence() {
        let fasta = b">seg4 influenza segment 4 (HA)\nACGTACGT\nNNNN\n";
        let records = parse(Cursor::new(&fasta[..])).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "seg4");
        assert_eq!(records[0].sequence, b"ACGTACGTNNNN");
    }

    #[test]
    fn parse_multiple_sequences_in_order() {
        let fasta = b">chr1\nACGT\n>chr2\nTTTT\nAAAA\n>chr3\nGGG\n";
        let records = parse(Cursor::new(&fasta[..])).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].name, "chr1");
        assert_eq!(records[1].sequence, b"TTTTAAAA");
        assert_eq!(records[2].name, "chr3");
        assert_eq!(index_of(&records, "chr2"), Some(1));
        assert_eq!(index_of(&records, "chrX"), None);
    }

    #[test]
    fn case_preserved() {
        let fasta = b">seq1\nacgtACGT\n";
        let records = parse(Cursor::new(&fasta[..])).unwrap();
        assert_eq!(records[0].sequence, b"acgtACGT");
    }

    #[test]
    fn empty_header_is_error() {
        let fasta = b">\nACGT\n";
        assert!(parse(Cursor::new(&fasta[..])).is_err());
    }

    #[test]
    fn gz_round_trip() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(b">chr1\nACGT\n").unwrap();
        let gz = encoder.finish().unwrap();
        let records = parse_gz(Cursor::new(gz)).unwrap();
        assert_eq!(records[0].name, "chr1");
        assert_eq!(records[0].sequence, b"ACGT");
    }

    #[test]
    fn read_plain_file() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b">chr1 description\nACGT\nTT\n").unwrap();
        let records = read_file(f.path()).unwrap();
        assert_eq!(records[0].name, "chr1");
        assert_eq!(records[0].sequence, b"ACGTTT");
    }

    #[test]
    fn missing_file_is_error() {
        assert!(read_file(Path::new("/nonexistent/ref.fasta")).is_err());
    }
}
