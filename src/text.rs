//! Delimiter-collapsing field splitting for line-oriented inputs.

/// Splits `line` at `delim`, collapsing consecutive delimiters.
///
/// Consecutive delimiters never produce an empty field, and leading or
/// trailing delimiters are ignored. All of the tab- and space-delimited
/// formats consumed here (SAM bodies, BED tables, variant lists, FASTA
/// headers) are parsed with these semantics.
#[must_use]
pub fn split_fields(line: &str, delim: char) -> Vec<&str> {
    line.split(delim).filter(|f| !f.is_empty()).collect()
}
