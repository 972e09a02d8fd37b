//! # AppError
//!
//! Centralized error handling for the GhostX core.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all gx-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., no current group to leave)
    #[error("{0} not found: {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., reply too long, entity id not numeric)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Delete addressed a record that does not exist in its bucket
    #[error("index {index} out of range for bucket of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// The persistence backend failed (read, write, or decode)
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Anything else that should never happen
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub(crate) fn persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Persistence(format!("malformed stored value: {err}"))
    }
}

/// A specialized Result type for GhostX logic.
pub type Result<T> = std::result::Result<T, AppError>;
