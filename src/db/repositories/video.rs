//! Video repository
//!
//! Every video is returned with its topic and owning user attached.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use super::rows::{video_from_row, video_select, videos_from_rows};
use crate::db::DbPool;
use crate::models::{NewVideo, Video};

/// Sort order for video lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoOrder {
    /// Most recently created first
    #[default]
    Newest,
    /// Topic name, then video name
    TopicThenName,
}

impl VideoOrder {
    fn clause(self) -> &'static str {
        match self {
            VideoOrder::Newest => "ORDER BY v.id DESC",
            VideoOrder::TopicThenName => "ORDER BY t.name ASC, v.name ASC",
        }
    }
}

#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn create(&self, video: &NewVideo) -> Result<Video>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Video>>;

    async fn list(&self, order: VideoOrder) -> Result<Vec<Video>>;

    async fn list_by_user(&self, user_id: i64, order: VideoOrder) -> Result<Vec<Video>>;

    async fn list_by_topic(&self, topic_id: i64) -> Result<Vec<Video>>;

    /// Videos whose topic name equals `name`, ignoring case; newest first
    async fn list_by_topic_name(&self, name: &str) -> Result<Vec<Video>>;

    /// Overwrite every column of video `id`.
    async fn update(&self, id: i64, video: &NewVideo) -> Result<Video>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxVideoRepository {
    pool: DbPool,
}

impl SqlxVideoRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn VideoRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl VideoRepository for SqlxVideoRepository {
    async fn create(&self, video: &NewVideo) -> Result<Video> {
        let result = sqlx::query(
            r#"
            INSERT INTO videos (name, slug, thumbnail, youtube_id, user_id, topic_id)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&video.name)
        .bind(&video.slug)
        .bind(&video.thumbnail)
        .bind(&video.youtube_id)
        .bind(video.user_id)
        .bind(video.topic_id)
        .execute(&self.pool)
        .await
        .context("Failed to create video")?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .context("Created video could not be read back")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Video>> {
        let sql = video_select("WHERE v.id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get video by ID")?;
        row.as_ref().map(video_from_row).transpose()
    }

    async fn list(&self, order: VideoOrder) -> Result<Vec<Video>> {
        let sql = video_select(order.clause());
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list videos")?;
        videos_from_rows(&rows)
    }

    async fn list_by_user(&self, user_id: i64, order: VideoOrder) -> Result<Vec<Video>> {
        let sql = video_select(&format!("WHERE v.user_id = ? {}", order.clause()));
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list videos by user")?;
        videos_from_rows(&rows)
    }

    async fn list_by_topic(&self, topic_id: i64) -> Result<Vec<Video>> {
        let sql = video_select("WHERE v.topic_id = ? ORDER BY v.id DESC");
        let rows = sqlx::query(&sql)
            .bind(topic_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list videos by topic")?;
        videos_from_rows(&rows)
    }

    async fn list_by_topic_name(&self, name: &str) -> Result<Vec<Video>> {
        let sql = video_select("WHERE t.name = ? COLLATE NOCASE ORDER BY v.id DESC");
        let rows = sqlx::query(&sql)
            .bind(name)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list videos by topic name")?;
        videos_from_rows(&rows)
    }

    async fn update(&self, id: i64, video: &NewVideo) -> Result<Video> {
        sqlx::query(
            r#"
            UPDATE videos
            SET name = ?, slug = ?, thumbnail = ?, youtube_id = ?, user_id = ?, topic_id = ?
            WHERE id = ?
            "#,
        )
        .bind(&video.name)
        .bind(&video.slug)
        .bind(&video.thumbnail)
        .bind(&video.youtube_id)
        .bind(video.user_id)
        .bind(video.topic_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to update video")?;

        self.get_by_id(id)
            .await?
            .context("Updated video could not be read back")
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM videos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete video")?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{insert_topic, insert_user, insert_video, setup_pool};
    use crate::models::Role;

    #[tokio::test]
    async fn test_create_video_hydrates_relations() {
        let pool = setup_pool().await;
        let teacher = insert_user(&pool, "teach", Role::Teacher).await;
        let topic = insert_topic(&pool, "Physics").await;

        let video = insert_video(&pool, "Gravity", &teacher, &topic).await;

        assert!(video.id > 0);
        assert_eq!(video.slug, "gravity");
        assert_eq!(video.user.id, teacher.id);
        assert_eq!(video.user.meta.username, "teach");
        assert_eq!(video.topic, topic);
    }

    #[tokio::test]
    async fn test_list_orders() {
        let pool = setup_pool().await;
        let teacher = insert_user(&pool, "teach", Role::Teacher).await;
        let physics = insert_topic(&pool, "Physics").await;
        let algebra = insert_topic(&pool, "Algebra").await;
        insert_video(&pool, "Gravity", &teacher, &physics).await;
        insert_video(&pool, "Matrices", &teacher, &algebra).await;
        insert_video(&pool, "Atoms", &teacher, &physics).await;

        let repo = SqlxVideoRepository::new(pool);
        let newest: Vec<String> = repo
            .list(VideoOrder::Newest)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert_eq!(newest, vec!["Atoms", "Matrices", "Gravity"]);

        let grouped: Vec<String> = repo
            .list(VideoOrder::TopicThenName)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert_eq!(grouped, vec!["Matrices", "Atoms", "Gravity"]);
    }

    #[tokio::test]
    async fn test_list_by_user_and_topic() {
        let pool = setup_pool().await;
        let alice = insert_user(&pool, "alice", Role::Teacher).await;
        let bob = insert_user(&pool, "bob", Role::Teacher).await;
        let physics = insert_topic(&pool, "Physics").await;
        let algebra = insert_topic(&pool, "Algebra").await;
        insert_video(&pool, "Gravity", &alice, &physics).await;
        insert_video(&pool, "Matrices", &bob, &algebra).await;

        let repo = SqlxVideoRepository::new(pool);
        let by_alice = repo.list_by_user(alice.id, VideoOrder::Newest).await.unwrap();
        assert_eq!(by_alice.len(), 1);
        assert_eq!(by_alice[0].name, "Gravity");

        let by_topic = repo.list_by_topic(algebra.id).await.unwrap();
        assert_eq!(by_topic.len(), 1);
        assert_eq!(by_topic[0].name, "Matrices");

        let by_name = repo.list_by_topic_name("PHYSICS").await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert!(repo.list_by_topic_name("nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_video() {
        let pool = setup_pool().await;
        let alice = insert_user(&pool, "alice", Role::Teacher).await;
        let bob = insert_user(&pool, "bob", Role::Teacher).await;
        let physics = insert_topic(&pool, "Physics").await;
        let algebra = insert_topic(&pool, "Algebra").await;
        let video = insert_video(&pool, "Gravity", &alice, &physics).await;

        let repo = SqlxVideoRepository::new(pool);
        let updated = repo
            .update(
                video.id,
                &NewVideo {
                    name: "Vectors".to_string(),
                    slug: "vectors".to_string(),
                    thumbnail: "https://img.example.com/v.jpg".to_string(),
                    youtube_id: "abc123".to_string(),
                    user_id: bob.id,
                    topic_id: algebra.id,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Vectors");
        assert_eq!(updated.user.id, bob.id);
        assert_eq!(updated.topic.id, algebra.id);

        assert!(repo.delete(video.id).await.unwrap());
        assert!(repo.get_by_id(video.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_video_requires_existing_topic() {
        let pool = setup_pool().await;
        let alice = insert_user(&pool, "alice", Role::Teacher).await;
        let repo = SqlxVideoRepository::new(pool);

        let result = repo
            .create(&NewVideo {
                name: "Orphan".to_string(),
                slug: "orphan".to_string(),
                thumbnail: "t".to_string(),
                youtube_id: "y".to_string(),
                user_id: alice.id,
                topic_id: 4242,
            })
            .await;
        assert!(result.is_err());
    }
}
