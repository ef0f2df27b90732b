//! Video service
//!
//! Teachers manage their own videos, admins manage all of them. Every
//! mutation goes through [`authorize`] with the video's owner.

use std::sync::Arc;

use crate::db::repositories::{TopicRepository, UserRepository, VideoOrder, VideoRepository};
use crate::models::{NewVideo, Video, VideoPatch};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::policy::{authorize, Gate, Requester};
use crate::services::slug::slugify;
use crate::services::topic::MSG_TOPIC_NOT_FOUND;
use crate::services::user::MSG_USER_NOT_FOUND;
use crate::services::validation::{id_field, VideoForm};

pub const MSG_VIDEO_NOT_FOUND: &str = "Video was not found.";
pub const MSG_OWN_VIDEOS_ONLY: &str = "Teachers can only edit own videos.";
pub const MSG_CREATE_OWN_ONLY: &str = "You can only add videos for your own account.";
pub const MSG_DELETE_NOT_ALLOWED: &str = "You are not authorized to delete that video.";
pub const MSG_TEACHER_NOT_FOUND: &str = "Teacher was not found.";
pub const MSG_ASSIGN_TEACHERS_ONLY: &str = "You can assign videos only to teachers.";

pub struct VideoService {
    videos: Arc<dyn VideoRepository>,
    topics: Arc<dyn TopicRepository>,
    users: Arc<dyn UserRepository>,
}

impl VideoService {
    pub fn new(
        videos: Arc<dyn VideoRepository>,
        topics: Arc<dyn TopicRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            videos,
            topics,
            users,
        }
    }

    /// Newest first, optionally limited to a topic name (ignoring case).
    pub async fn list(&self, topic_name: Option<&str>) -> ServiceResult<Vec<Video>> {
        match topic_name.map(str::trim).filter(|t| !t.is_empty()) {
            Some(name) => Ok(self.videos.list_by_topic_name(name).await?),
            None => Ok(self.videos.list(VideoOrder::Newest).await?),
        }
    }

    pub async fn list_by_owner(&self, user_id: i64) -> ServiceResult<Vec<Video>> {
        Ok(self.videos.list_by_user(user_id, VideoOrder::Newest).await?)
    }

    /// Dashboard list: topic then name. Teachers only see their own videos;
    /// `topic` keeps videos whose topic name matches exactly.
    pub async fn dashboard_list(
        &self,
        requester: Requester,
        topic: Option<&str>,
    ) -> ServiceResult<Vec<Video>> {
        let mut videos = if requester.is_admin() {
            self.videos.list(VideoOrder::TopicThenName).await?
        } else {
            self.videos
                .list_by_user(requester.id, VideoOrder::TopicThenName)
                .await?
        };
        if let Some(topic) = topic.filter(|t| !t.is_empty()) {
            videos.retain(|v| v.topic.name == topic);
        }
        Ok(videos)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Video> {
        self.videos
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(MSG_VIDEO_NOT_FOUND))
    }

    /// A video the requester may edit.
    pub async fn get_editable(&self, requester: Requester, id: i64) -> ServiceResult<Video> {
        let video = self.get(id).await?;
        authorize(requester, Gate::Teacher, Some(video.owner_id()))
            .or_forbidden(MSG_OWN_VIDEOS_ONLY)?;
        Ok(video)
    }

    pub async fn create(&self, requester: Requester, form: &VideoForm) -> ServiceResult<Video> {
        form.validate().into_result()?;
        let topic_id = id_field(&form.topic_id).unwrap_or_default();
        let user_id = id_field(&form.user_id).unwrap_or_default();

        authorize(requester, Gate::Teacher, Some(user_id))
            .or_forbidden(MSG_CREATE_OWN_ONLY)?;
        if self.topics.get_by_id(topic_id).await?.is_none() {
            return Err(ServiceError::not_found(MSG_TOPIC_NOT_FOUND));
        }
        if self.users.get_by_id(user_id).await?.is_none() {
            return Err(ServiceError::not_found(MSG_USER_NOT_FOUND));
        }

        let video = self
            .videos
            .create(&NewVideo {
                name: form.name.trim().to_string(),
                slug: slugify(&form.name),
                thumbnail: form.thumbnail.trim().to_string(),
                youtube_id: form.youtube_id.trim().to_string(),
                user_id,
                topic_id,
            })
            .await?;
        tracing::info!("Created video {} for user {}", video.id, user_id);
        Ok(video)
    }

    /// Apply a partial update. Renaming recomputes the slug. A new owner
    /// must exist and be a teacher, and teachers cannot give their videos
    /// away.
    pub async fn update(
        &self,
        requester: Requester,
        id: i64,
        patch: VideoPatch,
    ) -> ServiceResult<Video> {
        let video = self.get_editable(requester, id).await?;

        if let Some(topic_id) = patch.topic_id {
            if self.topics.get_by_id(topic_id).await?.is_none() {
                return Err(ServiceError::not_found(MSG_TOPIC_NOT_FOUND));
            }
        }
        if let Some(user_id) = patch.user_id {
            let owner = self
                .users
                .get_by_id(user_id)
                .await?
                .ok_or_else(|| ServiceError::not_found(MSG_TEACHER_NOT_FOUND))?;
            if !owner.is_teacher() {
                return Err(ServiceError::conflict(MSG_ASSIGN_TEACHERS_ONLY));
            }
            authorize(requester, Gate::Teacher, Some(owner.id))
                .or_forbidden(MSG_OWN_VIDEOS_ONLY)?;
        }

        let mut next = NewVideo {
            name: video.name.clone(),
            slug: video.slug.clone(),
            thumbnail: video.thumbnail.clone(),
            youtube_id: video.youtube_id.clone(),
            user_id: video.owner_id(),
            topic_id: video.topic.id,
        };
        if let Some(name) = patch.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
            next.slug = slugify(&name);
            next.name = name;
        }
        if let Some(thumbnail) = patch.thumbnail.filter(|t| !t.trim().is_empty()) {
            next.thumbnail = thumbnail.trim().to_string();
        }
        if let Some(youtube_id) = patch.youtube_id.filter(|y| !y.trim().is_empty()) {
            next.youtube_id = youtube_id.trim().to_string();
        }
        if let Some(topic_id) = patch.topic_id {
            next.topic_id = topic_id;
        }
        if let Some(user_id) = patch.user_id {
            next.user_id = user_id;
        }

        Ok(self.videos.update(video.id, &next).await?)
    }

    pub async fn delete(&self, requester: Requester, id: i64) -> ServiceResult<()> {
        let video = self.get(id).await?;
        authorize(requester, Gate::Teacher, Some(video.owner_id()))
            .or_forbidden(MSG_DELETE_NOT_ALLOWED)?;
        self.videos.delete(video.id).await?;
        tracing::info!("Deleted video {}", video.id);
        Ok(())
    }
}
