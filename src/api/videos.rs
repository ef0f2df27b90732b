//! Video API endpoints
//!
//! - GET /api/videos, GET /api/videos/{id} - any signed-in user
//! - POST /api/videos, DELETE /api/videos - admins
//! - PUT /api/videos - teachers (own videos) and admins

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::api::common::{path_id, require_id, IdBody};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::MessageResponse;
use crate::models::{Video, VideoPatch};
use crate::services::error::MSG_NOT_FOUND;
use crate::services::validation::{id_field, lenient_text, VideoForm};

/// Body of PUT /api/videos. `teacher_id` moves the video to another
/// teacher.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateVideoRequest {
    #[serde(deserialize_with = "lenient_text")]
    pub id: String,
    #[serde(deserialize_with = "lenient_text")]
    pub topic_id: String,
    pub name: Option<String>,
    pub thumbnail: Option<String>,
    pub youtube_id: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub teacher_id: String,
}

impl UpdateVideoRequest {
    fn patch(self) -> VideoPatch {
        VideoPatch {
            name: self.name.filter(|n| !n.trim().is_empty()),
            thumbnail: self.thumbnail.filter(|t| !t.trim().is_empty()),
            youtube_id: self.youtube_id.filter(|y| !y.trim().is_empty()),
            topic_id: id_field(&self.topic_id),
            user_id: id_field(&self.teacher_id),
        }
    }
}

/// GET /api/videos
pub async fn list_videos(State(state): State<AppState>) -> Result<Json<Vec<Video>>, ApiError> {
    Ok(Json(state.videos.list(None).await?))
}

/// GET /api/videos/{id}
pub async fn get_video(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Video>, ApiError> {
    let id = path_id(&id, MSG_NOT_FOUND)?;
    Ok(Json(state.videos.get(id).await?))
}

/// POST /api/videos
pub async fn create_video(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<VideoForm>,
) -> Result<(StatusCode, Json<Video>), ApiError> {
    let video = state.videos.create(user.requester(), &body).await?;
    Ok((StatusCode::CREATED, Json(video)))
}

/// PUT /api/videos
pub async fn update_video(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<UpdateVideoRequest>,
) -> Result<Json<Video>, ApiError> {
    let id = require_id(id_field(&body.id))?;
    let video = state
        .videos
        .update(user.requester(), id, body.patch())
        .await?;
    Ok(Json(video))
}

/// DELETE /api/videos
pub async fn delete_video(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<IdBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = require_id(body.id())?;
    state.videos.delete(user.requester(), id).await?;
    Ok(Json(MessageResponse::success()))
}
