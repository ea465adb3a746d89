//! Error types for wire decoding.

use thiserror::Error;

/// Errors that can occur when decoding wire objects.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// A watch line was not valid JSON or did not match the event shape.
    #[error("invalid watch event: {0}")]
    InvalidWatchEvent(String),

    /// The event object could not be decoded as the expected kind.
    #[error("invalid {kind} object: {message}")]
    InvalidObject { kind: &'static str, message: String },

    /// A required identity field was empty.
    #[error("{kind} is missing {field}")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },
}
