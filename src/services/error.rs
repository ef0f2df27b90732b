//! Errors shared by all services

use crate::services::validation::FieldErrors;

/// Generic messages used when a more specific one is not needed
pub const MSG_BAD_REQUEST: &str = "Bad Request";
pub const MSG_UNAUTHORIZED: &str = "Unauthorized";
pub const MSG_NOT_FOUND: &str = "Not Found";

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Per-field form errors
    #[error("Validation failed")]
    Validation(FieldErrors),

    /// Malformed request outside of a form (missing id and the like)
    #[error("{0}")]
    BadRequest(String),

    /// Duplicate email, username or topic, or a wrong role for the target
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// Role gate or ownership check failed
    #[error("{0}")]
    Forbidden(String),

    /// Known email, wrong password
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing, oversized or wrongly typed upload
    #[error("{0}")]
    InvalidUpload(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }
}

impl From<FieldErrors> for ServiceError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
