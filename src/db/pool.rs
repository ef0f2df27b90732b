//! SQLite connection pool
//!
//! The platform runs on a single SQLite file. `create_pool` normalizes the
//! configured URL, makes sure the parent directory exists and turns on
//! foreign key enforcement, which the cascade rules in the schema rely on.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::config::DatabaseConfig;

/// Shared pool handle. `SqlitePool` is reference counted internally.
pub type DbPool = SqlitePool;

/// Turn a configured database location into a sqlx connection URL.
fn connection_url(url: &str) -> String {
    if url == ":memory:" || url == "sqlite::memory:" {
        "sqlite::memory:".to_string()
    } else if url.starts_with("sqlite:") {
        if url.contains('?') {
            url.to_string()
        } else {
            format!("{}?mode=rwc", url)
        }
    } else {
        format!("sqlite:{}?mode=rwc", url)
    }
}

fn ensure_parent_dir(url: &str) -> Result<()> {
    if url.contains(":memory:") {
        return Ok(());
    }
    let path = url.trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }
    }
    Ok(())
}

async fn connect(url: &str, max_connections: u32) -> Result<DbPool> {
    ensure_parent_dir(url)?;
    let options = SqliteConnectOptions::from_str(&connection_url(url))
        .with_context(|| format!("Invalid SQLite URL: {}", url))?
        .foreign_keys(true);

    let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
    if url.contains(":memory:") {
        // Closing the only connection would drop the database
        pool_options = pool_options.idle_timeout(None).max_lifetime(None);
    }

    let pool = pool_options
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to SQLite database: {}", url))?;

    Ok(pool)
}

/// Create the application pool from configuration.
pub async fn create_pool(config: &DatabaseConfig) -> Result<DbPool> {
    let max = if config.url.contains(":memory:") { 1 } else { 10 };
    let pool = connect(&config.url, max).await?;
    ping(&pool).await?;
    tracing::info!("Connected to SQLite database {}", config.url);
    Ok(pool)
}

/// In-memory database for tests.
///
/// Every connection to `sqlite::memory:` opens its own database, so the test
/// pool is pinned to a single connection.
pub async fn create_test_pool() -> Result<DbPool> {
    connect(":memory:", 1).await
}

/// Check that the database answers.
pub async fn ping(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .context("Database ping failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    #[test]
    fn test_connection_url_variants() {
        assert_eq!(connection_url(":memory:"), "sqlite::memory:");
        assert_eq!(connection_url("data/app.db"), "sqlite:data/app.db?mode=rwc");
        assert_eq!(connection_url("sqlite:data/app.db"), "sqlite:data/app.db?mode=rwc");
        assert_eq!(connection_url("sqlite:data/app.db?mode=ro"), "sqlite:data/app.db?mode=ro");
    }

    #[tokio::test]
    async fn test_memory_pool_ping() {
        let pool = create_test_pool().await.expect("Failed to create pool");
        ping(&pool).await.expect("Ping should succeed");
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let pool = create_test_pool().await.expect("Failed to create pool");
        let row = sqlx::query("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        let enabled: i64 = row.get(0);
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn test_file_pool_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("app.db");
        let config = DatabaseConfig {
            url: path.display().to_string(),
        };

        let pool = create_pool(&config).await.expect("Failed to create pool");
        ping(&pool).await.unwrap();
        assert!(path.exists());
    }
}
