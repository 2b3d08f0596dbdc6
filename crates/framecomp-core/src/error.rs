//! Error types for framecomp.

use thiserror::Error;

/// Main error type for framecomp operations.
#[derive(Error, Debug)]
pub enum FramecompError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Caller bug: non-positive rate/time base, negative time, malformed range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Requested timestamp lies beyond the end of the stream.
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// No matching entry, e.g. no keyframe at or before a requested pts.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Propagated verbatim from the external decoder.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Propagated from the external muxer/writer.
    #[error("Mux error: {0}")]
    Mux(String),
}

/// Result type alias for framecomp operations.
pub type Result<T> = std::result::Result<T, FramecompError>;
