//! Request bodies shared by several API endpoints

use serde::Deserialize;

use crate::services::user::MSG_ID_REQUIRED;
use crate::services::validation::{id_field, lenient_text};
use crate::services::{ServiceError, ServiceResult};

/// `{ "id": ... }`, the body of the delete endpoints
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IdBody {
    #[serde(deserialize_with = "lenient_text")]
    pub id: String,
}

impl IdBody {
    pub fn id(&self) -> Option<i64> {
        id_field(&self.id)
    }
}

/// An id the request cannot do without. Missing or unparseable ids are a
/// 400 with "Id is required.".
pub fn require_id(id: Option<i64>) -> ServiceResult<i64> {
    id.ok_or_else(|| ServiceError::bad_request(MSG_ID_REQUIRED))
}

/// Id from a path segment. Unparseable ids cannot exist, so they are
/// reported as not found with `message`.
pub fn path_id(raw: &str, message: &str) -> ServiceResult<i64> {
    id_field(raw).ok_or_else(|| ServiceError::not_found(message))
}
