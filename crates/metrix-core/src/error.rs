//! Shared error type across metrix crates.

use std::time::Duration;

use thiserror::Error;

/// Shared result type.
pub type Result<T> = std::result::Result<T, MetrixError>;

/// Unified error type used by the engine and the host layer.
#[derive(Debug, Error)]
pub enum MetrixError {
    /// A metric was requested as a kind other than the one stored under its identity.
    #[error("metric {identity} is a {actual}, not a {expected}")]
    KindMismatch {
        identity: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("unsupported sample type: {0}")]
    UnsupportedSample(String),
    #[error("sample timed out after {0:?}")]
    SampleTimeout(Duration),
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl MetrixError {
    /// Stable machine-readable code, used in reporter logs.
    pub fn code(&self) -> &'static str {
        match self {
            MetrixError::KindMismatch { .. } => "KIND_MISMATCH",
            MetrixError::UnsupportedSample(_) => "UNSUPPORTED_SAMPLE",
            MetrixError::SampleTimeout(_) => "SAMPLE_TIMEOUT",
            MetrixError::BadConfig(_) => "BAD_CONFIG",
            MetrixError::Internal(_) => "INTERNAL",
        }
    }
}
