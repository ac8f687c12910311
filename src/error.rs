//! Error types for vdjstream

use thiserror::Error;

/// Result type alias for vdjstream operations
pub type Result<T> = std::result::Result<T, VdjError>;

/// Error types that can occur in vdjstream
#[derive(Debug, Error)]
pub enum VdjError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed VDJXML structure
    #[error("Invalid VDJXML format at line {line}: {msg}")]
    Format {
        /// Line number where error occurred (1-based)
        line: usize,
        /// Error message
        msg: String,
    },

    /// A requested tag or tag prefix is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Removal of a tag the record does not carry
    #[error("Tag not present on record: {0}")]
    MissingTag(String),

    /// A record was routed to a V/J bucket that was never created
    #[error("No partition for V segment '{v}' and J segment '{j}'")]
    UnknownCategory {
        /// V segment of the offending record
        v: String,
        /// J segment of the offending record
        j: String,
    },

    /// Caller violated an operation's precondition
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// The external batch queue misbehaved (submit rejected, unparsable reply)
    #[error("Job queue error: {0}")]
    Queue(String),
}
