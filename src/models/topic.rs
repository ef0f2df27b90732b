//! Topic model

use serde::{Deserialize, Serialize};

use super::Video;

/// A subject area that videos are filed under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub name: String,
    /// URL-friendly, unique
    pub slug: String,
    /// File name of the icon under the topic icon directory
    pub icon: Option<String>,
}

/// Topic together with the videos filed under it
#[derive(Debug, Clone, Serialize)]
pub struct TopicWithVideos {
    #[serde(flatten)]
    pub topic: Topic,
    pub videos: Vec<Video>,
}

#[derive(Debug, Clone)]
pub struct NewTopic {
    pub name: String,
    pub slug: String,
    pub icon: Option<String>,
}
