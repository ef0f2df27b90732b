//! Playlist model

use serde::Serialize;

use super::{User, Video};

/// An ordered collection of videos owned by one user
#[derive(Debug, Clone, Serialize)]
pub struct Playlist {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub user: User,
    /// Member videos in insertion order
    pub videos: Vec<Video>,
}

impl Playlist {
    pub fn owner_id(&self) -> i64 {
        self.user.id
    }

    pub fn video_ids(&self) -> Vec<i64> {
        self.videos.iter().map(|v| v.id).collect()
    }
}

#[derive(Debug, Clone)]
pub struct NewPlaylist {
    pub name: String,
    pub slug: String,
    pub user_id: i64,
    pub video_ids: Vec<i64>,
}

/// How an update treats the submitted video ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoSetMode {
    /// Add the submitted videos after the existing ones
    Append,
    /// The submitted videos become the whole set
    Replace,
}
