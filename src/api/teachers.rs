//! Teacher API endpoints
//!
//! - GET /api/teachers, GET /api/teachers/{id} - any signed-in user
//! - POST /api/teachers, DELETE /api/teachers - admins
//! - PUT /api/teachers - teachers (own account) and admins

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::api::common::{path_id, IdBody};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::MessageResponse;
use crate::models::{Role, User, UserPatch};
use crate::services::error::MSG_NOT_FOUND;
use crate::services::validation::{id_field, lenient_text, RegisterForm};

/// Body of PUT /api/teachers. Absent or blank fields are left alone.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateTeacherRequest {
    #[serde(deserialize_with = "lenient_text")]
    pub id: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl UpdateTeacherRequest {
    fn patch(self) -> UserPatch {
        UserPatch {
            email: self.email,
            password: self.password,
            firstname: self.firstname,
            lastname: self.lastname,
            username: self.username,
            role: None,
        }
    }
}

/// GET /api/teachers
pub async fn list_teachers(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.users.list_teachers().await?))
}

/// GET /api/teachers/{id}
pub async fn get_teacher(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let id = path_id(&id, MSG_NOT_FOUND)?;
    Ok(Json(state.users.get_teacher(id).await?))
}

/// POST /api/teachers
pub async fn create_teacher(
    State(state): State<AppState>,
    Json(body): Json<RegisterForm>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let teacher = state.users.create_account(&body, Role::Teacher).await?;
    tracing::info!("Created teacher {}", teacher.username());
    Ok((StatusCode::CREATED, Json(teacher)))
}

/// PUT /api/teachers
pub async fn update_teacher(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<UpdateTeacherRequest>,
) -> Result<Json<User>, ApiError> {
    let id = id_field(&body.id);
    let teacher = state
        .users
        .update_teacher(user.requester(), id, body.patch())
        .await?;
    Ok(Json(teacher))
}

/// DELETE /api/teachers
pub async fn delete_teacher(
    State(state): State<AppState>,
    Json(body): Json<IdBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.users.delete_teacher(body.id()).await?;
    Ok(Json(MessageResponse::success()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_keeps_missing_fields_unset() {
        let body: UpdateTeacherRequest =
            serde_json::from_str(r#"{"id": 3, "firstname": "Grace"}"#).unwrap();
        assert_eq!(id_field(&body.id), Some(3));
        let patch = body.patch();
        assert_eq!(patch.firstname.as_deref(), Some("Grace"));
        assert!(patch.email.is_none());
        assert!(patch.role.is_none());
    }
}
