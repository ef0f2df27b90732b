//! User model
//!
//! A user is an email/password account with a role and a profile
//! (`UserMeta`) carrying the public username, real name and avatar.

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Avatar assigned to every new account
pub const DEFAULT_AVATAR_FILENAME: &str = "default_avatar.png";

/// A registered account.
///
/// The password hash is never serialized, so a `User` can go straight into a
/// JSON response or a template context.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    #[serde(rename = "usermeta")]
    pub meta: UserMeta,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn username(&self) -> &str {
        &self.meta.username
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_teacher(&self) -> bool {
        self.role == Role::Teacher
    }
}

/// Public profile attached to a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMeta {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
    pub username: String,
    pub avatar: Option<String>,
}

/// Account role.
///
/// The numeric ids match the seeded `roles` table: 1 reader, 2 teacher,
/// 3 admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    #[default]
    Reader,
    Teacher,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Reader, Role::Teacher, Role::Admin];

    pub fn id(self) -> i64 {
        match self {
            Role::Reader => 1,
            Role::Teacher => 2,
            Role::Admin => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Reader => "reader",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Role::Reader),
            2 => Some(Role::Teacher),
            3 => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    /// Accepts a label (`"teacher"`) or a numeric id (`"2"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(id) = s.parse::<i64>() {
            return Role::from_id(id).ok_or_else(|| anyhow::anyhow!("Invalid role id: {}", id));
        }
        match s.to_lowercase().as_str() {
            "reader" => Ok(Role::Reader),
            "teacher" => Ok(Role::Teacher),
            "admin" => Ok(Role::Admin),
            _ => Err(anyhow::anyhow!("Invalid role: {}", s)),
        }
    }
}

/// Serialized as the related `roles` row: `{"id": 2, "label": "teacher"}`.
impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Role", 2)?;
        state.serialize_field("id", &self.id())?;
        state.serialize_field("label", self.label())?;
        state.end()
    }
}

/// Everything needed to insert a user and its profile
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub firstname: String,
    pub lastname: String,
    pub username: String,
    pub avatar: Option<String>,
}

/// Partial update of an account. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub password: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub username: Option<String>,
    pub role: Option<Role>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.password.is_none()
            && self.firstname.is_none()
            && self.lastname.is_none()
            && self.username.is_none()
            && self.role.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: 7,
            email: "jane@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: Role::Teacher,
            meta: UserMeta {
                id: 3,
                firstname: "Jane".to_string(),
                lastname: "Doe".to_string(),
                username: "jane".to_string(),
                avatar: Some(DEFAULT_AVATAR_FILENAME.to_string()),
            },
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_role_ids_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_id(4), None);
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("teacher".parse::<Role>().unwrap(), Role::Teacher);
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("1".parse::<Role>().unwrap(), Role::Reader);
        assert!("editor".parse::<Role>().is_err());
        assert!("9".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Reader.to_string(), "reader");
        assert_eq!(Role::Admin.to_string(), "admin");
    }

    #[test]
    fn test_serialized_user_has_no_password() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"]["id"], 2);
        assert_eq!(json["role"]["label"], "teacher");
        assert_eq!(json["usermeta"]["username"], "jane");
    }

    #[test]
    fn test_user_role_helpers() {
        let mut user = sample_user();
        assert!(user.is_teacher());
        assert!(!user.is_admin());
        user.role = Role::Admin;
        assert!(user.is_admin());
        assert_eq!(user.username(), "jane");
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(UserPatch::default().is_empty());
        let patch = UserPatch {
            lastname: Some("Smith".to_string()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
