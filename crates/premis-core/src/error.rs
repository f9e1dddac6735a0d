//! Error types for the PREMIS system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PremisError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Data source error: {0}")]
    DataSource(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type PremisResult<T> = Result<T, PremisError>;

/// A single per-field validation failure, reported alongside an access
/// decision so the endpoint layer can surface it inline.
///
/// `code` is the machine-readable identifier the UI keys its messages on
/// (e.g. `error.organizationIdIsRequired`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    pub code: String,
}

impl FieldError {
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: code.into(),
        }
    }
}
