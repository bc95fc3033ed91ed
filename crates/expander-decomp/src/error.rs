//! Error types for expander decomposition.

use thiserror::Error;

/// Result type alias for decomposition operations.
pub type Result<T> = std::result::Result<T, DecompositionError>;

/// Errors surfaced to callers of the library.
///
/// Programmer preconditions (mis-sized index maps, empty subsets handed to
/// the solver) are asserted instead; unrouted flow and partial matchings are
/// expected signals, not errors.
#[derive(Error, Debug)]
pub enum DecompositionError {
    /// The input graph is malformed (self-loop, endpoint out of range).
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    /// A user-supplied parameter is outside its documented range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The input stream is not a well-formed graph file.
    #[error("parse error: {0}")]
    Parse(String),

    /// IO errors while reading graph input.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
