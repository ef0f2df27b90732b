//! Topic service
//!
//! Topics are keyed by their slug. Every topic has an icon stored as
//! `{slug}.png`; renaming a topic with a new icon writes the icon under the
//! new slug and removes the old file.

use std::sync::Arc;

use crate::db::repositories::{TopicRepository, VideoRepository};
use crate::models::{NewTopic, Topic, TopicWithVideos};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::media::{MediaStore, Upload};
use crate::services::slug::slugify;
use crate::services::validation::TopicForm;

pub const MSG_TOPIC_EXISTS: &str = "Topic already exists.";
pub const MSG_TOPIC_NOT_FOUND: &str = "Topic was not found.";
pub const MSG_ICON_REQUIRED: &str = "Icon file is required.";

pub struct TopicService {
    topics: Arc<dyn TopicRepository>,
    videos: Arc<dyn VideoRepository>,
    media: MediaStore,
}

impl TopicService {
    pub fn new(
        topics: Arc<dyn TopicRepository>,
        videos: Arc<dyn VideoRepository>,
        media: MediaStore,
    ) -> Self {
        Self {
            topics,
            videos,
            media,
        }
    }

    /// All topics by name, or those named `name` (ignoring case).
    pub async fn list(&self, name: Option<&str>) -> ServiceResult<Vec<Topic>> {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => Ok(self.topics.find_by_name(name).await?),
            None => Ok(self.topics.list().await?),
        }
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Topic> {
        self.topics
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(MSG_TOPIC_NOT_FOUND))
    }

    pub async fn get_with_videos(&self, id: i64) -> ServiceResult<TopicWithVideos> {
        let topic = self.get(id).await?;
        let videos = self.videos.list_by_topic(topic.id).await?;
        Ok(TopicWithVideos { topic, videos })
    }

    /// Create a topic with its icon. The slug must be free and an icon is
    /// required.
    pub async fn create(&self, form: &TopicForm, icon: Option<Upload>) -> ServiceResult<Topic> {
        form.validate().into_result()?;
        let name = form.name.trim();
        let slug = slugify(name);

        if self.topics.get_by_slug(&slug).await?.is_some() {
            return Err(ServiceError::conflict(MSG_TOPIC_EXISTS));
        }
        let icon =
            icon.ok_or_else(|| ServiceError::InvalidUpload(MSG_ICON_REQUIRED.to_string()))?;
        let filename = self.media.save_icon(&slug, &icon).await?;

        let topic = self
            .topics
            .create(&NewTopic {
                name: name.to_string(),
                slug,
                icon: Some(filename),
            })
            .await?;
        tracing::info!("Created topic {}", topic.slug);
        Ok(topic)
    }

    /// Rename a topic and optionally replace its icon. Videos stay attached.
    pub async fn update(
        &self,
        id: i64,
        form: &TopicForm,
        icon: Option<Upload>,
    ) -> ServiceResult<Topic> {
        form.validate().into_result()?;
        let mut topic = self.get(id).await?;
        let name = form.name.trim();
        let slug = slugify(name);

        if let Some(existing) = self.topics.get_by_slug(&slug).await? {
            if existing.id != topic.id {
                return Err(ServiceError::conflict(MSG_TOPIC_EXISTS));
            }
        }

        let previous = topic.icon.clone();
        let mut saved = None;
        if let Some(icon) = icon {
            let filename = self.media.save_icon(&slug, &icon).await?;
            topic.icon = Some(filename.clone());
            saved = Some(filename);
        }
        topic.name = name.to_string();
        topic.slug = slug;

        let updated = match self.topics.update(&topic).await {
            Ok(updated) => updated,
            Err(e) => {
                if let Some(new) = saved.filter(|new| previous.as_ref() != Some(new)) {
                    self.media.remove_icon(&new).await;
                }
                return Err(e.into());
            }
        };
        if saved.is_some() {
            if let Some(old) = previous.filter(|old| updated.icon.as_ref() != Some(old)) {
                self.media.remove_icon(&old).await;
            }
        }
        Ok(updated)
    }

    /// Delete a topic, its videos and its icon.
    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        let topic = self.get(id).await?;
        self.topics.delete(topic.id).await?;
        if let Some(icon) = &topic.icon {
            self.media.remove_icon(icon).await;
        }
        tracing::info!("Deleted topic {}", topic.slug);
        Ok(())
    }
}
