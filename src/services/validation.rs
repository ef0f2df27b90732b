//! Form validation
//!
//! Each form validates to a [`FieldErrors`] map. Only the first problem per
//! field is kept, matching how the pages show one message under each
//! input. The same forms back the JSON API, where a non-empty map becomes a
//! 400 response body.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::services::policy::parse_id;

pub const MIN_PASSWORD_LEN: usize = 8;

pub const MSG_FIRSTNAME_REQUIRED: &str = "First name is required.";
pub const MSG_LASTNAME_REQUIRED: &str = "Last name is required.";
pub const MSG_USERNAME_REQUIRED: &str = "User name is required.";
pub const MSG_EMAIL_REQUIRED: &str = "Email is required.";
pub const MSG_EMAIL_INVALID: &str = "Please provide a valid email.";
pub const MSG_PASSWORD_SHORT: &str = "Password must have at least 8 characters.";
pub const MSG_NAME_REQUIRED: &str = "Name is required.";
pub const MSG_USER_REQUIRED: &str = "User is required.";
pub const MSG_TOPIC_REQUIRED: &str = "Topic is required.";
pub const MSG_THUMBNAIL_REQUIRED: &str = "Thumbnail is required.";
pub const MSG_YOUTUBE_REQUIRED: &str = "YouTube ID is required.";
pub const MSG_ROLE_REQUIRED: &str = "Role is required.";
pub const MSG_CURRENT_REQUIRED: &str = "Current password is required.";
pub const MSG_NEW_PASSWORD_REQUIRED: &str = "New password is required.";
pub const MSG_CONFIRM_REQUIRED: &str = "Confirmation is required.";
pub const MSG_PASSWORD_MISMATCH: &str = "Passwords do not match.";

/// Field name to message, first error per field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` for `field` unless it already has one.
    pub fn add(&mut self, field: &str, message: &str) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.to_string());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    fn required(&mut self, field: &str, value: &str, message: &str) -> bool {
        if value.trim().is_empty() {
            self.add(field, message);
            false
        } else {
            true
        }
    }

    fn email(&mut self, field: &str, value: &str) {
        if self.required(field, value, MSG_EMAIL_REQUIRED) && !is_valid_email(value) {
            self.add(field, MSG_EMAIL_INVALID);
        }
    }

    fn min_password(&mut self, field: &str, value: &str) {
        if value.chars().count() < MIN_PASSWORD_LEN {
            self.add(field, MSG_PASSWORD_SHORT);
        }
    }
}

/// Loose `local@domain.tld` check: one `@`, non-empty local part, a dot in
/// the domain that is neither first nor last, and no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rfind('.') {
        Some(dot) => dot > 0 && dot < domain.len() - 1 && !domain.starts_with('.'),
        None => false,
    }
}

/// Accept a JSON string, number or null as text. Form posts send ids as
/// strings while API clients usually send numbers.
pub fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    })
}

/// Parse a text field that must hold an id.
pub fn id_field(value: &str) -> Option<i64> {
    parse_id(value)
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RegisterForm {
    pub firstname: String,
    pub lastname: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.required("firstname", &self.firstname, MSG_FIRSTNAME_REQUIRED);
        errors.required("lastname", &self.lastname, MSG_LASTNAME_REQUIRED);
        errors.required("username", &self.username, MSG_USERNAME_REQUIRED);
        errors.email("email", &self.email);
        errors.min_password("password", &self.password);
        errors
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.email("email", &self.email);
        errors.min_password("password", &self.password);
        errors
    }
}

/// Profile fields a user edits on their account page
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AccountForm {
    pub firstname: String,
    pub lastname: String,
    pub username: String,
    pub email: String,
}

impl AccountForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.required("firstname", &self.firstname, MSG_FIRSTNAME_REQUIRED);
        errors.required("lastname", &self.lastname, MSG_LASTNAME_REQUIRED);
        errors.required("username", &self.username, MSG_USERNAME_REQUIRED);
        errors.email("email", &self.email);
        errors
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PasswordForm {
    pub current: String,
    pub newpassword: String,
    pub confirm: String,
}

impl PasswordForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.required("current", &self.current, MSG_CURRENT_REQUIRED);
        if errors.required("newpassword", &self.newpassword, MSG_NEW_PASSWORD_REQUIRED) {
            errors.min_password("newpassword", &self.newpassword);
        }
        if errors.required("confirm", &self.confirm, MSG_CONFIRM_REQUIRED)
            && self.confirm != self.newpassword
        {
            errors.add("confirm", MSG_PASSWORD_MISMATCH);
        }
        errors
    }
}

/// Admin create/edit user form
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UserForm {
    #[serde(deserialize_with = "lenient_text")]
    pub role_id: String,
    pub firstname: String,
    pub lastname: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl UserForm {
    /// A password is mandatory when creating. When editing an empty
    /// password keeps the current one.
    pub fn validate(&self, creating: bool) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if id_field(&self.role_id).is_none() {
            errors.add("role_id", MSG_ROLE_REQUIRED);
        }
        errors.required("firstname", &self.firstname, MSG_FIRSTNAME_REQUIRED);
        errors.required("lastname", &self.lastname, MSG_LASTNAME_REQUIRED);
        errors.required("username", &self.username, MSG_USERNAME_REQUIRED);
        errors.email("email", &self.email);
        if creating {
            if errors.required("password", &self.password, MSG_NEW_PASSWORD_REQUIRED) {
                errors.min_password("password", &self.password);
            }
        } else if !self.password.is_empty() {
            errors.min_password("password", &self.password);
        }
        errors
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct VideoForm {
    #[serde(deserialize_with = "lenient_text")]
    pub topic_id: String,
    pub name: String,
    pub thumbnail: String,
    pub youtube_id: String,
    #[serde(deserialize_with = "lenient_text")]
    pub user_id: String,
}

impl VideoForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if id_field(&self.topic_id).is_none() {
            errors.add("topic_id", MSG_TOPIC_REQUIRED);
        }
        errors.required("name", &self.name, MSG_NAME_REQUIRED);
        errors.required("thumbnail", &self.thumbnail, MSG_THUMBNAIL_REQUIRED);
        errors.required("youtube_id", &self.youtube_id, MSG_YOUTUBE_REQUIRED);
        if id_field(&self.user_id).is_none() {
            errors.add("user_id", MSG_USER_REQUIRED);
        }
        errors
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PlaylistForm {
    pub name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub user_id: String,
}

impl PlaylistForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.required("name", &self.name, MSG_NAME_REQUIRED);
        if id_field(&self.user_id).is_none() {
            errors.add("user_id", MSG_USER_REQUIRED);
        }
        errors
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TopicForm {
    pub name: String,
}

impl TopicForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.required("name", &self.name, MSG_NAME_REQUIRED);
        errors
    }
}

/// Comma separated video ids from the playlist editor. Blank and
/// non-numeric entries are skipped; order is kept.
pub fn parse_id_list(raw: &str) -> Vec<i64> {
    raw.split(',').filter_map(parse_id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn register() -> RegisterForm {
        RegisterForm {
            firstname: "Ada".to_string(),
            lastname: "Lovelace".to_string(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "analytical".to_string(),
        }
    }

    #[test]
    fn test_valid_register_form() {
        assert!(register().validate().is_empty());
    }

    #[test]
    fn test_register_form_messages() {
        let errors = RegisterForm::default().validate();
        assert_eq!(errors.get("firstname"), Some(MSG_FIRSTNAME_REQUIRED));
        assert_eq!(errors.get("lastname"), Some(MSG_LASTNAME_REQUIRED));
        assert_eq!(errors.get("username"), Some(MSG_USERNAME_REQUIRED));
        assert_eq!(errors.get("email"), Some(MSG_EMAIL_REQUIRED));
        assert_eq!(errors.get("password"), Some(MSG_PASSWORD_SHORT));
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn test_email_format_checked_after_presence() {
        let mut form = register();
        form.email = "not-an-email".to_string();
        assert_eq!(form.validate().get("email"), Some(MSG_EMAIL_INVALID));
    }

    #[test]
    fn test_email_rules() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last@sub.example.org"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.com"));
        assert!(!is_valid_email("a@@b.com"));
        assert!(!is_valid_email("a@.com"));
        assert!(!is_valid_email("a@b."));
        assert!(!is_valid_email("a b@c.com"));
    }

    #[test]
    fn test_password_form() {
        let form = PasswordForm {
            current: String::new(),
            newpassword: "short".to_string(),
            confirm: "other".to_string(),
        };
        let errors = form.validate();
        assert_eq!(errors.get("current"), Some(MSG_CURRENT_REQUIRED));
        assert_eq!(errors.get("newpassword"), Some(MSG_PASSWORD_SHORT));
        assert_eq!(errors.get("confirm"), Some(MSG_PASSWORD_MISMATCH));

        let empty = PasswordForm::default().validate();
        assert_eq!(empty.get("newpassword"), Some(MSG_NEW_PASSWORD_REQUIRED));
        assert_eq!(empty.get("confirm"), Some(MSG_CONFIRM_REQUIRED));
    }

    #[test]
    fn test_user_form_password_only_required_on_create() {
        let form = UserForm {
            role_id: "2".to_string(),
            firstname: "T".to_string(),
            lastname: "T".to_string(),
            username: "t".to_string(),
            email: "t@example.com".to_string(),
            password: String::new(),
        };
        assert_eq!(form.validate(true).get("password"), Some(MSG_NEW_PASSWORD_REQUIRED));
        assert!(form.validate(false).is_empty());

        let missing_role = UserForm {
            role_id: String::new(),
            ..form
        };
        assert_eq!(missing_role.validate(false).get("role_id"), Some(MSG_ROLE_REQUIRED));
    }

    #[test]
    fn test_video_form_accepts_numeric_ids_from_json() {
        let form: VideoForm = serde_json::from_value(serde_json::json!({
            "topic_id": 3,
            "name": "Gravity",
            "thumbnail": "https://img.example.com/g.jpg",
            "youtube_id": "abc",
            "user_id": "7"
        }))
        .unwrap();
        assert_eq!(form.topic_id, "3");
        assert_eq!(form.user_id, "7");
        assert!(form.validate().is_empty());
    }

    #[test]
    fn test_video_form_messages() {
        let errors = VideoForm::default().validate();
        assert_eq!(errors.get("topic_id"), Some(MSG_TOPIC_REQUIRED));
        assert_eq!(errors.get("thumbnail"), Some(MSG_THUMBNAIL_REQUIRED));
        assert_eq!(errors.get("youtube_id"), Some(MSG_YOUTUBE_REQUIRED));
        assert_eq!(errors.get("user_id"), Some(MSG_USER_REQUIRED));
    }

    #[test]
    fn test_field_errors_serialize_as_flat_map() {
        let errors = PlaylistForm::default().validate();
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": MSG_NAME_REQUIRED, "user_id": MSG_USER_REQUIRED})
        );
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("3, 1,2"), vec![3, 1, 2]);
        assert_eq!(parse_id_list(""), Vec::<i64>::new());
        assert_eq!(parse_id_list("4,,x,5"), vec![4, 5]);
    }

    proptest! {
        #[test]
        fn first_error_per_field_wins(a in "[a-z ]{1,20}", b in "[a-z ]{1,20}") {
            let mut errors = FieldErrors::new();
            errors.add("field", &a);
            errors.add("field", &b);
            prop_assert_eq!(errors.get("field"), Some(a.as_str()));
            prop_assert_eq!(errors.len(), 1);
        }

        #[test]
        fn short_passwords_rejected(password in ".{0,7}") {
            let mut form = register();
            form.password = password;
            let errors = form.validate();
            prop_assert_eq!(errors.get("password"), Some(MSG_PASSWORD_SHORT));
        }

        #[test]
        fn topic_name_whitespace_only_is_missing(name in "[ \t]{0,5}") {
            let form = TopicForm { name };
            let errors = form.validate();
            prop_assert_eq!(errors.get("name"), Some(MSG_NAME_REQUIRED));
        }
    }
}
