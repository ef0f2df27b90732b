//! Videostar (favorite) repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

use super::rows::{video_from_row, USER_COLUMNS, VIDEO_COLUMNS, VIDEO_FROM};
use crate::db::DbPool;
use crate::models::Videostar;

#[async_trait]
pub trait VideostarRepository: Send + Sync {
    /// Stars of a user with the starred videos, newest first
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Videostar>>;

    async fn video_ids_by_user(&self, user_id: i64) -> Result<Vec<i64>>;

    /// Star a video. Returns false when it was already starred.
    async fn add(&self, user_id: i64, video_id: i64) -> Result<bool>;

    /// Remove a user's star. Returns false when there was none.
    async fn remove(&self, user_id: i64, video_id: i64) -> Result<bool>;
}

pub struct SqlxVideostarRepository {
    pool: DbPool,
}

impl SqlxVideostarRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn VideostarRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl VideostarRepository for SqlxVideostarRepository {
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Videostar>> {
        let sql = format!(
            "SELECT s.id AS s_id, s.user_id AS s_user_id, s.created_at AS s_created_at, {}, {} {} \
             JOIN videostars s ON s.video_id = v.id WHERE s.user_id = ? ORDER BY s.id DESC",
            VIDEO_COLUMNS, USER_COLUMNS, VIDEO_FROM
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list videostars")?;

        rows.iter()
            .map(|row| {
                Ok(Videostar {
                    id: row.try_get("s_id")?,
                    user_id: row.try_get("s_user_id")?,
                    video: video_from_row(row)?,
                    created_at: row.try_get("s_created_at")?,
                })
            })
            .collect()
    }

    async fn video_ids_by_user(&self, user_id: i64) -> Result<Vec<i64>> {
        let ids: Vec<(i64,)> =
            sqlx::query_as("SELECT video_id FROM videostars WHERE user_id = ? ORDER BY id DESC")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
                .context("Failed to list starred video ids")?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn add(&self, user_id: i64, video_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO videostars (user_id, video_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(video_id)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await
        .context("Failed to star video")?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove(&self, user_id: i64, video_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM videostars WHERE user_id = ? AND video_id = ?")
            .bind(user_id)
            .bind(video_id)
            .execute(&self.pool)
            .await
            .context("Failed to remove star")?;
        Ok(result.rows_affected() > 0)
    }
}
