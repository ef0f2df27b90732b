//! Playlist API endpoints
//!
//! - GET /api/playlists, GET /api/playlists/{id} - any signed-in user
//! - POST /api/playlists, POST /api/playlists/addVideo,
//!   DELETE /api/playlists - admins
//! - PUT /api/playlists - teachers (own playlists) and admins; the
//!   submitted videos are appended

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::api::common::{path_id, require_id, IdBody};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::MessageResponse;
use crate::models::{Playlist, VideoSetMode};
use crate::services::error::MSG_NOT_FOUND;
use crate::services::validation::{id_field, lenient_text, PlaylistForm};
use crate::services::ServiceError;

const MSG_PLAYLIST_ID_REQUIRED: &str = "ID is required.";

/// `{ "id": ... }` inside a playlist's `videos` array
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VideoRef {
    #[serde(deserialize_with = "lenient_text")]
    pub id: String,
}

/// Body of POST and PUT /api/playlists
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PlaylistRequest {
    #[serde(deserialize_with = "lenient_text")]
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub user_id: String,
    pub videos: Vec<VideoRef>,
}

impl PlaylistRequest {
    fn form(&self) -> PlaylistForm {
        PlaylistForm {
            name: self.name.clone(),
            user_id: self.user_id.clone(),
        }
    }

    /// Ids of the listed videos; entries without a usable id are skipped.
    fn video_ids(&self) -> Vec<i64> {
        self.videos.iter().filter_map(|v| id_field(&v.id)).collect()
    }
}

/// Body of POST /api/playlists/addVideo
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddVideoRequest {
    #[serde(deserialize_with = "lenient_text")]
    pub playlist_id: String,
    #[serde(deserialize_with = "lenient_text")]
    pub video_id: String,
}

/// GET /api/playlists
pub async fn list_playlists(
    State(state): State<AppState>,
) -> Result<Json<Vec<Playlist>>, ApiError> {
    Ok(Json(state.playlists.list(None).await?))
}

/// GET /api/playlists/{id}
pub async fn get_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Playlist>, ApiError> {
    let id = path_id(&id, MSG_NOT_FOUND)?;
    Ok(Json(state.playlists.get(id).await?))
}

/// POST /api/playlists
pub async fn create_playlist(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<PlaylistRequest>,
) -> Result<(StatusCode, Json<Playlist>), ApiError> {
    let playlist = state
        .playlists
        .create(user.requester(), &body.form(), &body.video_ids())
        .await?;
    Ok((StatusCode::CREATED, Json(playlist)))
}

/// PUT /api/playlists
pub async fn update_playlist(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<PlaylistRequest>,
) -> Result<Json<Playlist>, ApiError> {
    let form = body.form();
    form.validate().into_result().map_err(ApiError::Fields)?;
    let id = require_id(id_field(&body.id))?;
    let playlist = state
        .playlists
        .update(
            user.requester(),
            id,
            &form,
            &body.video_ids(),
            VideoSetMode::Append,
        )
        .await?;
    Ok(Json(playlist))
}

/// POST /api/playlists/addVideo
pub async fn add_video(
    State(state): State<AppState>,
    Json(body): Json<AddVideoRequest>,
) -> Result<Json<Playlist>, ApiError> {
    let playlist = state
        .playlists
        .add_video(id_field(&body.playlist_id), id_field(&body.video_id))
        .await?;
    Ok(Json(playlist))
}

/// DELETE /api/playlists
pub async fn delete_playlist(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<IdBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = body
        .id()
        .ok_or_else(|| ServiceError::bad_request(MSG_PLAYLIST_ID_REQUIRED))?;
    state.playlists.delete(user.requester(), id).await?;
    Ok(Json(MessageResponse::success()))
}
