//! Starred (favorite) videos

use std::sync::Arc;

use crate::db::repositories::{VideoRepository, VideostarRepository};
use crate::models::Videostar;
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::video::MSG_VIDEO_NOT_FOUND;

pub struct StarService {
    stars: Arc<dyn VideostarRepository>,
    videos: Arc<dyn VideoRepository>,
}

impl StarService {
    pub fn new(stars: Arc<dyn VideostarRepository>, videos: Arc<dyn VideoRepository>) -> Self {
        Self { stars, videos }
    }

    /// Most recently starred first.
    pub async fn list(&self, user_id: i64) -> ServiceResult<Vec<Videostar>> {
        Ok(self.stars.list_by_user(user_id).await?)
    }

    /// Ids of the videos `user_id` starred, for marking list entries.
    pub async fn starred_ids(&self, user_id: i64) -> ServiceResult<Vec<i64>> {
        Ok(self.stars.video_ids_by_user(user_id).await?)
    }

    /// Star a video. Starring it twice keeps a single star.
    pub async fn add(&self, user_id: i64, video_id: i64) -> ServiceResult<()> {
        if self.videos.get_by_id(video_id).await?.is_none() {
            return Err(ServiceError::not_found(MSG_VIDEO_NOT_FOUND));
        }
        if self.stars.add(user_id, video_id).await? {
            tracing::debug!("User {} starred video {}", user_id, video_id);
        }
        Ok(())
    }

    /// Remove the requester's own star; other users' stars are untouched.
    pub async fn remove(&self, user_id: i64, video_id: i64) -> ServiceResult<()> {
        self.stars.remove(user_id, video_id).await?;
        Ok(())
    }
}
