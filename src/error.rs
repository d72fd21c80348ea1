//! Error types for the shrinkr library.

use thiserror::Error;

/// Result type alias for shrinkr operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while packing or unpacking data.
///
/// Broken internal invariants (a probability leaving its valid range, a
/// self-referencing edge, edges still alive after a parse) are bugs and
/// panic instead of surfacing here.
#[derive(Debug, Error)]
pub enum Error {
    /// A tuning parameter lies outside its accepted range.
    #[error("invalid value {value} for {name}: must be between {min} and {max}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Rejected value.
        value: usize,
        /// Smallest accepted value.
        min: usize,
        /// Largest accepted value.
        max: usize,
    },

    /// Empty data without zero padding has no encoding.
    #[error("nothing to compress: input is empty and no zero padding was requested")]
    EmptyInput,

    /// Input does not fit the 32-bit position space of the parser.
    #[error("input of {len} bytes exceeds the maximum of {max} bytes")]
    InputTooLarge {
        /// Input length in bytes.
        len: usize,
        /// Largest accepted length.
        max: usize,
    },

    /// Growing a parse structure failed.
    #[error(
        "out of memory while allocating {requested} {what}; reduce the number of \
         reference edges, free up memory or split the input into smaller pieces"
    )]
    OutOfMemory {
        /// What was being allocated.
        what: &'static str,
        /// Number of elements requested.
        requested: usize,
    },

    /// The compressed stream does not describe valid data.
    #[error("corrupt stream: {0}")]
    CorruptStream(String),

    /// File I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn oom(what: &'static str, requested: usize) -> Self {
        Error::OutOfMemory { what, requested }
    }

    /// Whether this is an allocation failure.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Error::OutOfMemory { .. })
    }
}
