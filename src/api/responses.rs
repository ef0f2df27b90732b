//! Shared API response types

use serde::{Deserialize, Serialize};

pub const MSG_SUCCESS: &str = "Success";
pub const MSG_INTERNAL_ERROR: &str = "Internal Server Error";

/// `{ "message": ... }`, the body of every non-entity response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn success() -> Self {
        Self::new(MSG_SUCCESS)
    }
}

/// `{ "token": ... }` returned by a successful login
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}
