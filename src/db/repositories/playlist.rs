//! Playlist repository
//!
//! Membership lives in `playlist_videos` with an explicit `position`, so a
//! playlist's videos come back in the order they were added. The
//! `(playlist_id, video_id)` primary key keeps each video in a playlist at
//! most once.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};
use std::sync::Arc;

use super::rows::{user_from_row, video_select, videos_from_rows, USER_COLUMNS};
use crate::db::DbPool;
use crate::models::{NewPlaylist, Playlist, Video};

/// Sort order for playlist lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaylistOrder {
    #[default]
    Newest,
    /// Owner username, then playlist name
    OwnerThenName,
}

#[async_trait]
pub trait PlaylistRepository: Send + Sync {
    async fn create(&self, playlist: &NewPlaylist) -> Result<Playlist>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Playlist>>;

    async fn list(&self, order: PlaylistOrder) -> Result<Vec<Playlist>>;

    async fn list_by_user(&self, user_id: i64, order: PlaylistOrder) -> Result<Vec<Playlist>>;

    async fn list_by_username(&self, username: &str) -> Result<Vec<Playlist>>;

    /// Update name, slug and owner.
    async fn update(&self, id: i64, name: &str, slug: &str, user_id: i64) -> Result<()>;

    /// Make `video_ids` the whole membership, in that order.
    async fn replace_videos(&self, id: i64, video_ids: &[i64]) -> Result<()>;

    /// Add `video_ids` after the current members. Videos already present are
    /// skipped. Returns how many were added.
    async fn append_videos(&self, id: i64, video_ids: &[i64]) -> Result<usize>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxPlaylistRepository {
    pool: DbPool,
}

impl SqlxPlaylistRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn PlaylistRepository> {
        Arc::new(Self::new(pool))
    }

    async fn videos_of(&self, playlist_id: i64) -> Result<Vec<Video>> {
        let sql = video_select(
            "JOIN playlist_videos pv ON pv.video_id = v.id \
             WHERE pv.playlist_id = ? ORDER BY pv.position ASC",
        );
        let rows = sqlx::query(&sql)
            .bind(playlist_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to load playlist videos")?;
        videos_from_rows(&rows)
    }

    async fn hydrate(&self, row: &SqliteRow) -> Result<Playlist> {
        let id: i64 = row.try_get("p_id")?;
        Ok(Playlist {
            id,
            name: row.try_get("p_name")?,
            slug: row.try_get("p_slug")?,
            user: user_from_row(row)?,
            videos: self.videos_of(id).await?,
        })
    }

    async fn hydrate_all(&self, rows: Vec<SqliteRow>) -> Result<Vec<Playlist>> {
        let mut playlists = Vec::with_capacity(rows.len());
        for row in &rows {
            playlists.push(self.hydrate(row).await?);
        }
        Ok(playlists)
    }
}

fn playlist_select(tail: &str) -> String {
    format!(
        "SELECT p.id AS p_id, p.name AS p_name, p.slug AS p_slug, {} \
         FROM playlists p JOIN users u ON u.id = p.user_id JOIN user_meta m ON m.user_id = u.id {}",
        USER_COLUMNS, tail
    )
}

fn order_clause(order: PlaylistOrder) -> &'static str {
    match order {
        PlaylistOrder::Newest => "ORDER BY p.id DESC",
        PlaylistOrder::OwnerThenName => "ORDER BY m.username ASC, p.name ASC",
    }
}

async fn insert_members(
    tx: &mut Transaction<'_, Sqlite>,
    playlist_id: i64,
    start: i64,
    video_ids: &[i64],
) -> Result<usize> {
    let mut position = start;
    let mut added = 0;
    for video_id in video_ids {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO playlist_videos (playlist_id, video_id, position) VALUES (?, ?, ?)",
        )
        .bind(playlist_id)
        .bind(video_id)
        .bind(position)
        .execute(&mut **tx)
        .await
        .context("Failed to add video to playlist")?;
        if result.rows_affected() > 0 {
            position += 1;
            added += 1;
        }
    }
    Ok(added)
}

#[async_trait]
impl PlaylistRepository for SqlxPlaylistRepository {
    async fn create(&self, playlist: &NewPlaylist) -> Result<Playlist> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let result = sqlx::query("INSERT INTO playlists (name, slug, user_id) VALUES (?, ?, ?)")
            .bind(&playlist.name)
            .bind(&playlist.slug)
            .bind(playlist.user_id)
            .execute(&mut *tx)
            .await
            .context("Failed to create playlist")?;
        let id = result.last_insert_rowid();

        insert_members(&mut tx, id, 0, &playlist.video_ids).await?;
        tx.commit().await.context("Failed to commit playlist")?;

        self.get_by_id(id)
            .await?
            .context("Created playlist could not be read back")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Playlist>> {
        let sql = playlist_select("WHERE p.id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get playlist by ID")?;
        match row {
            Some(row) => Ok(Some(self.hydrate(&row).await?)),
            None => Ok(None),
        }
    }

    async fn list(&self, order: PlaylistOrder) -> Result<Vec<Playlist>> {
        let sql = playlist_select(order_clause(order));
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list playlists")?;
        self.hydrate_all(rows).await
    }

    async fn list_by_user(&self, user_id: i64, order: PlaylistOrder) -> Result<Vec<Playlist>> {
        let sql = playlist_select(&format!("WHERE p.user_id = ? {}", order_clause(order)));
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list playlists by user")?;
        self.hydrate_all(rows).await
    }

    async fn list_by_username(&self, username: &str) -> Result<Vec<Playlist>> {
        let sql = playlist_select("WHERE m.username = ? ORDER BY p.id DESC");
        let rows = sqlx::query(&sql)
            .bind(username)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list playlists by username")?;
        self.hydrate_all(rows).await
    }

    async fn update(&self, id: i64, name: &str, slug: &str, user_id: i64) -> Result<()> {
        sqlx::query("UPDATE playlists SET name = ?, slug = ?, user_id = ? WHERE id = ?")
            .bind(name)
            .bind(slug)
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update playlist")?;
        Ok(())
    }

    async fn replace_videos(&self, id: i64, video_ids: &[i64]) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        sqlx::query("DELETE FROM playlist_videos WHERE playlist_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear playlist videos")?;
        insert_members(&mut tx, id, 0, video_ids).await?;
        tx.commit().await.context("Failed to commit playlist videos")?;
        Ok(())
    }

    async fn append_videos(&self, id: i64, video_ids: &[i64]) -> Result<usize> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let (next,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM playlist_videos WHERE playlist_id = ?",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to read playlist positions")?;
        let added = insert_members(&mut tx, id, next, video_ids).await?;
        tx.commit().await.context("Failed to commit playlist videos")?;
        Ok(added)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM playlists WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete playlist")?;
        Ok(result.rows_affected() > 0)
    }
}
