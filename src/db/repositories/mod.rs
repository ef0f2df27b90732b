//! Database repositories
//!
//! One repository per aggregate. Each exposes an `async_trait` interface and
//! a sqlx-backed implementation with a `boxed()` constructor for the
//! services.

mod rows;

pub mod playlist;
pub mod topic;
pub mod user;
pub mod video;
pub mod videostar;

pub use playlist::{PlaylistOrder, PlaylistRepository, SqlxPlaylistRepository};
pub use topic::{SqlxTopicRepository, TopicRepository};
pub use user::{SqlxUserRepository, UserRepository};
pub use video::{SqlxVideoRepository, VideoOrder, VideoRepository};
pub use videostar::{SqlxVideostarRepository, VideostarRepository};
