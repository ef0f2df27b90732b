//! User repository
//!
//! Users are stored in two tables: `users` holds credentials and role,
//! `user_meta` holds the public profile. Both are written together and
//! read back through one join.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::rows::{user_from_row, user_select};
use crate::db::DbPool;
use crate::models::{NewUser, Role, User};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &NewUser) -> Result<User>;

    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// All users, username ascending
    async fn list(&self) -> Result<Vec<User>>;

    /// Users holding `role`, username ascending
    async fn list_by_role(&self, role: Role) -> Result<Vec<User>>;

    /// Persist every mutable field of `user` (credentials, role, profile).
    async fn update(&self, user: &User) -> Result<User>;

    /// Delete a user. Profile, videos, playlists and stars cascade.
    /// Returns false when no row matched.
    async fn delete(&self, id: i64) -> Result<bool>;

    async fn count_by_role(&self, role: Role) -> Result<i64>;
}

pub struct SqlxUserRepository {
    pool: DbPool,
}

impl SqlxUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &NewUser) -> Result<User> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let result = sqlx::query(
            r#"
            INSERT INTO users (email, password, role_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.id())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to create user")?;
        let id = result.last_insert_rowid();

        sqlx::query(
            r#"
            INSERT INTO user_meta (user_id, firstname, lastname, username, avatar)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(&user.username)
        .bind(&user.avatar)
        .execute(&mut *tx)
        .await
        .context("Failed to create user profile")?;

        tx.commit().await.context("Failed to commit user")?;

        self.get_by_id(id)
            .await?
            .context("Created user could not be read back")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = user_select("WHERE u.id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get user by ID")?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = user_select("WHERE u.email = ?");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get user by email")?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = user_select("WHERE m.username = ?");
        let row = sqlx::query(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get user by username")?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<User>> {
        let sql = user_select("ORDER BY m.username ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list users")?;
        rows.iter().map(user_from_row).collect()
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>> {
        let sql = user_select("WHERE u.role_id = ? ORDER BY m.username ASC");
        let rows = sqlx::query(&sql)
            .bind(role.id())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list users by role")?;
        rows.iter().map(user_from_row).collect()
    }

    async fn update(&self, user: &User) -> Result<User> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query(
            r#"
            UPDATE users SET email = ?, password = ?, role_id = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.id())
        .bind(Utc::now())
        .bind(user.id)
        .execute(&mut *tx)
        .await
        .context("Failed to update user")?;

        sqlx::query(
            r#"
            UPDATE user_meta SET firstname = ?, lastname = ?, username = ?, avatar = ?
            WHERE user_id = ?
            "#,
        )
        .bind(&user.meta.firstname)
        .bind(&user.meta.lastname)
        .bind(&user.meta.username)
        .bind(&user.meta.avatar)
        .bind(user.id)
        .execute(&mut *tx)
        .await
        .context("Failed to update user profile")?;

        tx.commit().await.context("Failed to commit user update")?;

        self.get_by_id(user.id)
            .await?
            .context("Updated user could not be read back")
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete user")?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_by_role(&self, role: Role) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role_id = ?")
            .bind(role.id())
            .fetch_one(&self.pool)
            .await
            .context("Failed to count users")?;
        Ok(count.0)
    }
}
