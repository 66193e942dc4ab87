//! Domain errors

use thiserror::Error;

/// Domain-level error types
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, field: &'static str, value: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            field,
            value: value.into(),
        }
    }
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
