//! Error types for the varhap library.

use thiserror::Error;

/// Errors that can occur during varhap operations.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A parse error occurred while reading input data.
    #[error("{0}")]
    Parse(String),

    /// A validation constraint was violated.
    #[error("{0}")]
    Validation(String),

    /// The reference sequence disagrees with the annotation or variant input.
    /// These abort the whole run; partial output may already be on disk.
    #[error("{0}")]
    Consistency(String),
}
