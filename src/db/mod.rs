//! Database layer
//!
//! SQLite pool creation, embedded migrations and the repositories that the
//! services build on.
//!
//! ```ignore
//! let pool = vidlearn::db::create_pool(&config.database).await?;
//! vidlearn::db::migrations::run_migrations(&pool).await?;
//! let users = vidlearn::db::repositories::SqlxUserRepository::boxed(pool.clone());
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

#[cfg(test)]
pub(crate) mod test_support;

pub use pool::{create_pool, create_test_pool, ping, DbPool};
