//! Topic API endpoints
//!
//! Create and update take `multipart/form-data` so the icon can travel
//! with the name.
//!
//! - GET /api/topics, GET /api/topics/{id} - any signed-in user
//! - POST, PUT, DELETE /api/topics - admins

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};

use crate::api::common::{path_id, require_id, IdBody};
use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::MessageResponse;
use crate::api::upload::UploadForm;
use crate::models::{Topic, TopicWithVideos};
use crate::services::error::MSG_NOT_FOUND;
use crate::services::validation::{id_field, TopicForm};

/// GET /api/topics
pub async fn list_topics(State(state): State<AppState>) -> Result<Json<Vec<Topic>>, ApiError> {
    Ok(Json(state.topics.list(None).await?))
}

/// GET /api/topics/{id}, with the topic's videos
pub async fn get_topic(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TopicWithVideos>, ApiError> {
    let id = path_id(&id, MSG_NOT_FOUND)?;
    Ok(Json(state.topics.get_with_videos(id).await?))
}

/// POST /api/topics
pub async fn create_topic(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Topic>), ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let body = TopicForm {
        name: form.text("name").to_string(),
    };
    let topic = state.topics.create(&body, form.take_file("icon")).await?;
    Ok((StatusCode::CREATED, Json(topic)))
}

/// PUT /api/topics
pub async fn update_topic(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Topic>, ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let body = TopicForm {
        name: form.text("name").to_string(),
    };
    body.validate().into_result().map_err(ApiError::Fields)?;
    let id = require_id(id_field(form.text("id")))?;
    let topic = state.topics.update(id, &body, form.take_file("icon")).await?;
    Ok(Json(topic))
}

/// DELETE /api/topics
pub async fn delete_topic(
    State(state): State<AppState>,
    Json(body): Json<IdBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = require_id(body.id())?;
    state.topics.delete(id).await?;
    Ok(Json(MessageResponse::success()))
}
