//! Validation failures and the API error payload.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures raised before any API call is made.
#[derive(Error, Debug)]
pub enum Error {
    /// A required field is missing or a value is out of range.
    #[error("Validation: {0}")]
    Validation(String),
}

/// An error response from the API server.
#[derive(Error, Deserialize, Serialize, Debug, Clone, Eq, PartialEq)]
#[error("{message} ({reason})")]
pub struct ErrorResponse {
    /// Status of the operation, typically `Failure`
    pub status: String,
    /// Human-readable description of the failure
    #[serde(default)]
    pub message: String,
    /// Machine-readable failure category, e.g. `Conflict` or `NotFound`
    #[serde(default)]
    pub reason: String,
    /// HTTP status code
    pub code: u16,
}

impl ErrorResponse {
    /// Canonical `409 Conflict` payload for a stale resource version.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: "Failure".to_string(),
            message: message.into(),
            reason: "Conflict".to_string(),
            code: 409,
        }
    }
}
