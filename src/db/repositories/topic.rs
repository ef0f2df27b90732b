//! Topic repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use super::rows::topic_from_row;
use crate::db::DbPool;
use crate::models::{NewTopic, Topic};

#[async_trait]
pub trait TopicRepository: Send + Sync {
    async fn create(&self, topic: &NewTopic) -> Result<Topic>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Topic>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Topic>>;

    /// Topics whose name equals `name`, ignoring case
    async fn find_by_name(&self, name: &str) -> Result<Vec<Topic>>;

    /// All topics, name ascending
    async fn list(&self) -> Result<Vec<Topic>>;

    async fn update(&self, topic: &Topic) -> Result<Topic>;

    /// Delete a topic. Its videos cascade.
    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxTopicRepository {
    pool: DbPool,
}

impl SqlxTopicRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn TopicRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TopicRepository for SqlxTopicRepository {
    async fn create(&self, topic: &NewTopic) -> Result<Topic> {
        let result = sqlx::query("INSERT INTO topics (name, slug, icon) VALUES (?, ?, ?)")
            .bind(&topic.name)
            .bind(&topic.slug)
            .bind(&topic.icon)
            .execute(&self.pool)
            .await
            .context("Failed to create topic")?;

        Ok(Topic {
            id: result.last_insert_rowid(),
            name: topic.name.clone(),
            slug: topic.slug.clone(),
            icon: topic.icon.clone(),
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Topic>> {
        let row = sqlx::query("SELECT id, name, slug, icon FROM topics WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get topic by ID")?;
        row.as_ref().map(topic_from_row).transpose()
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Topic>> {
        let row = sqlx::query("SELECT id, name, slug, icon FROM topics WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get topic by slug")?;
        row.as_ref().map(topic_from_row).transpose()
    }

    async fn find_by_name(&self, name: &str) -> Result<Vec<Topic>> {
        let rows = sqlx::query(
            "SELECT id, name, slug, icon FROM topics WHERE name = ? COLLATE NOCASE ORDER BY name ASC",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await
        .context("Failed to find topics by name")?;
        rows.iter().map(topic_from_row).collect()
    }

    async fn list(&self) -> Result<Vec<Topic>> {
        let rows = sqlx::query("SELECT id, name, slug, icon FROM topics ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list topics")?;
        rows.iter().map(topic_from_row).collect()
    }

    async fn update(&self, topic: &Topic) -> Result<Topic> {
        sqlx::query("UPDATE topics SET name = ?, slug = ?, icon = ? WHERE id = ?")
            .bind(&topic.name)
            .bind(&topic.slug)
            .bind(&topic.icon)
            .bind(topic.id)
            .execute(&self.pool)
            .await
            .context("Failed to update topic")?;
        Ok(topic.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM topics WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete topic")?;
        Ok(result.rows_affected() > 0)
    }
}
