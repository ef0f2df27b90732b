//! Fixtures shared by repository and service tests

use super::repositories::{
    SqlxTopicRepository, SqlxUserRepository, SqlxVideoRepository, TopicRepository, UserRepository,
    VideoRepository,
};
use super::{create_test_pool, migrations, DbPool};
use crate::models::{
    NewTopic, NewUser, NewVideo, Role, Topic, User, Video, DEFAULT_AVATAR_FILENAME,
};

/// Migrated in-memory database
pub async fn setup_pool() -> DbPool {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Profile for `username` with `{username}@example.com`. The stored hash is
/// a placeholder, so these accounts cannot log in.
pub fn new_user(username: &str, role: Role) -> NewUser {
    NewUser {
        email: format!("{}@example.com", username),
        password_hash: "not-a-real-hash".to_string(),
        role,
        firstname: "Test".to_string(),
        lastname: username.to_string(),
        username: username.to_string(),
        avatar: Some(DEFAULT_AVATAR_FILENAME.to_string()),
    }
}

pub async fn insert_user(pool: &DbPool, username: &str, role: Role) -> User {
    SqlxUserRepository::new(pool.clone())
        .create(&new_user(username, role))
        .await
        .expect("Failed to insert user")
}

pub async fn insert_topic(pool: &DbPool, name: &str) -> Topic {
    SqlxTopicRepository::new(pool.clone())
        .create(&NewTopic {
            name: name.to_string(),
            slug: crate::services::slug::slugify(name),
            icon: None,
        })
        .await
        .expect("Failed to insert topic")
}

pub async fn insert_video(pool: &DbPool, name: &str, owner: &User, topic: &Topic) -> Video {
    SqlxVideoRepository::new(pool.clone())
        .create(&NewVideo {
            name: name.to_string(),
            slug: crate::services::slug::slugify(name),
            thumbnail: format!("https://img.example.com/{}.jpg", name.len()),
            youtube_id: format!("yt{}", name.len()),
            user_id: owner.id,
            topic_id: topic.id,
        })
        .await
        .expect("Failed to insert video")
}

/// Application state over a migrated in-memory database
pub async fn test_state() -> crate::api::AppState {
    crate::api::AppState::new(setup_pool().await, crate::config::Config::default())
        .expect("Failed to build app state")
}
