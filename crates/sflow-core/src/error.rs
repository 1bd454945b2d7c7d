//! Error types for the streaming pipeline.

use std::{fmt, io};

use thiserror::Error;

/// Failure to start a computation (bad program, authentication, unreadable source).
#[derive(Debug)]
pub struct ExecutionError {
    /// Backend error code, when one was reported.
    pub code: Option<i32>,
    /// Human-readable reason, when one was reported.
    pub message: Option<String>,
}

impl ExecutionError {
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: Some(message.into()),
        }
    }

    pub fn with_code(code: i32) -> Self {
        Self {
            code: Some(code),
            message: None,
        }
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.message, self.code) {
            (Some(message), _) => f.write_str(message),
            (None, Some(code)) => write!(f, "computation request failed ({code})"),
            (None, None) => f.write_str("computation request failed"),
        }
    }
}

impl std::error::Error for ExecutionError {}

/// Fatal error while resolving a series identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// The metadata's `sf_type` is not one this client understands.
    #[error("unknown metadata object of type {0}")]
    UnrecognizedMetadataKind(String),
}

/// A glyph ramp that cannot draw a sparkline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SparkStyleError {
    #[error("sparkline ramp needs at least 3 glyphs (blank, minimum, maximum), got {0}")]
    RampTooShort(usize),
    #[error("flat glyph index {index} is out of range for {len} glyphs")]
    FlatTickOutOfRange { index: usize, len: usize },
}

/// Errors that abort a streaming session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("computation request failed: {0}")]
    ExecutionRequestFailed(#[from] ExecutionError),

    /// The computation stream failed after it started.
    #[error("computation failed: {0}")]
    StreamFault(String),

    #[error("output error: {0}")]
    Io(#[from] io::Error),
}
