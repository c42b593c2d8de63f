//! Validation error type shared by request payloads

use serde::{Deserialize, Serialize};

/// Standard result type for payload validation
pub type ValidationResult = std::result::Result<(), ValidationError>;

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    /// Create a validation error for a field
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
