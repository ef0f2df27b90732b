//! Video and videostar models

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Topic, User};

/// A YouTube video owned by one user and filed under one topic
#[derive(Debug, Clone, Serialize)]
pub struct Video {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub thumbnail: String,
    pub youtube_id: String,
    /// Owning user
    pub user: User,
    pub topic: Topic,
}

impl Video {
    pub fn owner_id(&self) -> i64 {
        self.user.id
    }
}

#[derive(Debug, Clone)]
pub struct NewVideo {
    pub name: String,
    pub slug: String,
    pub thumbnail: String,
    pub youtube_id: String,
    pub user_id: i64,
    pub topic_id: i64,
}

/// Partial update of a video. The slug follows `name` when it changes.
#[derive(Debug, Clone, Default)]
pub struct VideoPatch {
    pub name: Option<String>,
    pub thumbnail: Option<String>,
    pub youtube_id: Option<String>,
    pub topic_id: Option<i64>,
    pub user_id: Option<i64>,
}

/// A user's favorite ("starred") video
#[derive(Debug, Clone, Serialize)]
pub struct Videostar {
    pub id: i64,
    pub user_id: i64,
    pub video: Video,
    pub created_at: DateTime<Utc>,
}
