//! Playlist service
//!
//! Submitted video ids are looked up concurrently and must all exist.
//! Duplicate ids collapse to the first occurrence, and adding a video that
//! is already in a playlist is a no-op.

use futures::future::try_join_all;
use std::collections::HashSet;
use std::sync::Arc;

use crate::db::repositories::{PlaylistOrder, PlaylistRepository, UserRepository, VideoRepository};
use crate::models::{NewPlaylist, Playlist, VideoSetMode};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::policy::{authorize, Gate, Requester};
use crate::services::slug::slugify;
use crate::services::user::MSG_USER_NOT_FOUND;
use crate::services::validation::{id_field, PlaylistForm};
use crate::services::video::MSG_VIDEO_NOT_FOUND;

pub const MSG_PLAYLIST_NOT_FOUND: &str = "Playlist was not found.";
pub const MSG_OWN_PLAYLISTS_ONLY: &str = "Teachers can only edit own playlists.";
pub const MSG_CREATE_OWN_ONLY: &str = "You can only add playlists for your own account.";
pub const MSG_DELETE_NOT_ALLOWED: &str = "You are not authorized to delete that playlist.";
pub const MSG_IDS_REQUIRED: &str = "Playlist ID and video ID are required.";

/// Keep the first occurrence of each id.
fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

pub struct PlaylistService {
    playlists: Arc<dyn PlaylistRepository>,
    videos: Arc<dyn VideoRepository>,
    users: Arc<dyn UserRepository>,
}

impl PlaylistService {
    pub fn new(
        playlists: Arc<dyn PlaylistRepository>,
        videos: Arc<dyn VideoRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            playlists,
            videos,
            users,
        }
    }

    /// Newest first, or only those owned by `username`.
    pub async fn list(&self, username: Option<&str>) -> ServiceResult<Vec<Playlist>> {
        match username.map(str::trim).filter(|u| !u.is_empty()) {
            Some(username) => Ok(self.playlists.list_by_username(username).await?),
            None => Ok(self.playlists.list(PlaylistOrder::Newest).await?),
        }
    }

    pub async fn list_by_owner(&self, user_id: i64) -> ServiceResult<Vec<Playlist>> {
        Ok(self
            .playlists
            .list_by_user(user_id, PlaylistOrder::Newest)
            .await?)
    }

    /// Dashboard list: owner then name. Teachers only see their own
    /// playlists; `name` is a case-insensitive substring filter.
    pub async fn dashboard_list(
        &self,
        requester: Requester,
        name: Option<&str>,
    ) -> ServiceResult<Vec<Playlist>> {
        let mut playlists = if requester.is_admin() {
            self.playlists.list(PlaylistOrder::OwnerThenName).await?
        } else {
            self.playlists
                .list_by_user(requester.id, PlaylistOrder::OwnerThenName)
                .await?
        };
        retain_by_name(&mut playlists, name);
        Ok(playlists)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Playlist> {
        self.playlists
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(MSG_PLAYLIST_NOT_FOUND))
    }

    /// A playlist the requester may edit.
    pub async fn get_editable(&self, requester: Requester, id: i64) -> ServiceResult<Playlist> {
        let playlist = self.get(id).await?;
        authorize(requester, Gate::Teacher, Some(playlist.owner_id()))
            .or_forbidden(MSG_OWN_PLAYLISTS_ONLY)?;
        Ok(playlist)
    }

    /// Look up every id at once. Returns the de-duplicated ids in input
    /// order, or `NotFound` if any of them is unknown.
    async fn resolve_videos(&self, ids: &[i64]) -> ServiceResult<Vec<i64>> {
        let ids = dedup_ids(ids);
        let found = try_join_all(ids.iter().map(|id| self.videos.get_by_id(*id))).await?;
        if found.iter().any(Option::is_none) {
            return Err(ServiceError::not_found(MSG_VIDEO_NOT_FOUND));
        }
        Ok(ids)
    }

    async fn ensure_user(&self, user_id: i64) -> ServiceResult<()> {
        match self.users.get_by_id(user_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found(MSG_USER_NOT_FOUND)),
        }
    }

    pub async fn create(
        &self,
        requester: Requester,
        form: &PlaylistForm,
        video_ids: &[i64],
    ) -> ServiceResult<Playlist> {
        form.validate().into_result()?;
        let user_id = id_field(&form.user_id).unwrap_or_default();
        authorize(requester, Gate::Teacher, Some(user_id))
            .or_forbidden(MSG_CREATE_OWN_ONLY)?;
        self.ensure_user(user_id).await?;
        let video_ids = self.resolve_videos(video_ids).await?;

        let name = form.name.trim();
        let playlist = self
            .playlists
            .create(&NewPlaylist {
                name: name.to_string(),
                slug: slugify(name),
                user_id,
                video_ids,
            })
            .await?;
        tracing::info!("Created playlist {} for user {}", playlist.id, user_id);
        Ok(playlist)
    }

    /// Rename or reassign a playlist and set its videos. `Append` adds the
    /// submitted videos after the existing ones, `Replace` makes them the
    /// whole set.
    pub async fn update(
        &self,
        requester: Requester,
        id: i64,
        form: &PlaylistForm,
        video_ids: &[i64],
        mode: VideoSetMode,
    ) -> ServiceResult<Playlist> {
        let playlist = self.get_editable(requester, id).await?;
        form.validate().into_result()?;
        let user_id = id_field(&form.user_id).unwrap_or_default();
        authorize(requester, Gate::Teacher, Some(user_id))
            .or_forbidden(MSG_OWN_PLAYLISTS_ONLY)?;
        if user_id != playlist.owner_id() {
            self.ensure_user(user_id).await?;
        }
        let video_ids = self.resolve_videos(video_ids).await?;

        let name = form.name.trim();
        self.playlists
            .update(playlist.id, name, &slugify(name), user_id)
            .await?;
        match mode {
            VideoSetMode::Replace => self.playlists.replace_videos(playlist.id, &video_ids).await?,
            VideoSetMode::Append => {
                self.playlists.append_videos(playlist.id, &video_ids).await?;
            }
        }
        self.get(playlist.id).await
    }

    /// Add one video. Adding a video that is already there changes nothing.
    pub async fn add_video(
        &self,
        playlist_id: Option<i64>,
        video_id: Option<i64>,
    ) -> ServiceResult<Playlist> {
        let (Some(playlist_id), Some(video_id)) = (playlist_id, video_id) else {
            return Err(ServiceError::bad_request(MSG_IDS_REQUIRED));
        };
        let playlist = self.get(playlist_id).await?;
        if self.videos.get_by_id(video_id).await?.is_none() {
            return Err(ServiceError::not_found(MSG_VIDEO_NOT_FOUND));
        }
        let added = self.playlists.append_videos(playlist.id, &[video_id]).await?;
        if added == 0 {
            tracing::debug!("Video {} already in playlist {}", video_id, playlist.id);
        }
        self.get(playlist.id).await
    }

    pub async fn delete(&self, requester: Requester, id: i64) -> ServiceResult<()> {
        let playlist = self.get(id).await?;
        authorize(requester, Gate::Teacher, Some(playlist.owner_id()))
            .or_forbidden(MSG_DELETE_NOT_ALLOWED)?;
        self.playlists.delete(playlist.id).await?;
        tracing::info!("Deleted playlist {}", playlist.id);
        Ok(())
    }
}

/// Keep the playlists whose name contains `name`, ignoring case. A blank
/// filter keeps everything.
pub fn retain_by_name(playlists: &mut Vec<Playlist>, name: Option<&str>) {
    if let Some(needle) = name.map(|n| n.trim().to_lowercase()).filter(|n| !n.is_empty()) {
        playlists.retain(|p| p.name.to_lowercase().contains(&needle));
    }
}
