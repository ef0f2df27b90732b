//! Data models
//!
//! Entities as the services and handlers see them: users with their role and
//! profile, topics, videos, playlists and videostars, plus the input and
//! patch types used to create and update them.

mod paging;
mod playlist;
mod topic;
mod user;
mod video;

pub use paging::{ListParams, Paged, Paging, ITEMS_PER_PAGE};
pub use playlist::{NewPlaylist, Playlist, VideoSetMode};
pub use topic::{NewTopic, Topic, TopicWithVideos};
pub use user::{NewUser, Role, User, UserMeta, UserPatch, DEFAULT_AVATAR_FILENAME};
pub use video::{NewVideo, Video, VideoPatch, Videostar};
