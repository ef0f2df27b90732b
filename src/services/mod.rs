//! Services layer - Business logic
//!
//! Services sit between the handlers and the repositories. They validate
//! input, apply the role and ownership policy, and translate storage results
//! into [`ServiceError`]s that the web and API layers map to responses.

pub mod auth;
pub mod error;
pub mod media;
pub mod password;
pub mod playlist;
pub mod policy;
pub mod slug;
pub mod star;
pub mod token;
pub mod topic;
pub mod user;
pub mod validation;
pub mod video;

pub use auth::AuthService;
pub use error::{ServiceError, ServiceResult};
pub use media::{MediaStore, Upload};
pub use password::{hash_password, verify_password};
pub use playlist::PlaylistService;
pub use policy::{authorize, parse_id, Decision, DenyReason, Gate, Requester};
pub use slug::slugify;
pub use star::StarService;
pub use token::{Claims, TokenService};
pub use topic::TopicService;
pub use user::UserService;
pub use validation::FieldErrors;
pub use video::VideoService;
