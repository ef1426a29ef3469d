//! Error types module
//!
//! This module provides the core error types used throughout mediaforge.
//! Every failure a transformation chain can produce is represented by
//! `TransformError`; the `ErrorMetadata` trait lets a serving boundary map
//! errors to HTTP responses without matching on variants.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "INVALID_PARAMETER")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("Malformed operation: {0}")]
    MalformedOperation(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Missing dimension: {0}")]
    MissingDimension(String),

    #[error("Mutually exclusive parameters: {0}")]
    MutuallyExclusiveParameters(String),

    #[error("Failed to decode media: {0}")]
    Decode(String),

    #[error("Failed to encode media: {0}")]
    Encode(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Static metadata for each variant: (http_status, error_code, recoverable, log_level).
/// client_message stays per-variant for dynamic content.
fn static_metadata(err: &TransformError) -> (u16, &'static str, bool, LogLevel) {
    match err {
        TransformError::MalformedOperation(_) => {
            (400, "MALFORMED_OPERATION", false, LogLevel::Debug)
        }
        TransformError::UnknownOperation(_) => (400, "UNKNOWN_OPERATION", false, LogLevel::Debug),
        TransformError::InvalidParameter(_) => (400, "INVALID_PARAMETER", false, LogLevel::Debug),
        TransformError::MissingDimension(_) => (400, "MISSING_DIMENSION", false, LogLevel::Debug),
        TransformError::MutuallyExclusiveParameters(_) => {
            (400, "MUTUALLY_EXCLUSIVE_PARAMETERS", false, LogLevel::Debug)
        }
        TransformError::Decode(_) => (400, "MEDIA_DECODE_ERROR", false, LogLevel::Warn),
        TransformError::Encode(_) => (500, "MEDIA_ENCODE_ERROR", false, LogLevel::Error),
        TransformError::Internal(_) => (500, "INTERNAL_ERROR", true, LogLevel::Error),
    }
}

impl TransformError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &'static str {
        match self {
            TransformError::MalformedOperation(_) => "MalformedOperation",
            TransformError::UnknownOperation(_) => "UnknownOperation",
            TransformError::InvalidParameter(_) => "InvalidParameter",
            TransformError::MissingDimension(_) => "MissingDimension",
            TransformError::MutuallyExclusiveParameters(_) => "MutuallyExclusiveParameters",
            TransformError::Decode(_) => "Decode",
            TransformError::Encode(_) => "Encode",
            TransformError::Internal(_) => "Internal",
        }
    }
}

impl ErrorMetadata for TransformError {
    fn http_status_code(&self) -> u16 {
        static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            TransformError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}
