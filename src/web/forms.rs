//! Form descriptions for the templates
//!
//! Create and edit pages hand `admin/form.html` a list of [`FormInput`]s
//! and the template draws each one by its `type`.

use serde::{Deserialize, Serialize};

use crate::models::{Role, Topic, User, Video};
use crate::services::FieldErrors;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl ToString, label: impl Into<String>) -> Self {
        Self {
            value: value.to_string(),
            label: label.into(),
        }
    }

    pub fn topics(topics: &[Topic]) -> Vec<Self> {
        topics.iter().map(|t| Self::new(t.id, t.name.clone())).collect()
    }

    pub fn users(users: &[User]) -> Vec<Self> {
        users
            .iter()
            .map(|u| Self::new(u.id, u.username().to_string()))
            .collect()
    }

    pub fn roles() -> Vec<Self> {
        Role::ALL
            .iter()
            .map(|r| Self::new(r.id(), r.label().to_string()))
            .collect()
    }

    pub fn videos(videos: &[Video]) -> Vec<Self> {
        videos
            .iter()
            .map(|v| Self::new(v.id, format!("{} / {}", v.topic.name, v.name)))
            .collect()
    }
}

/// One input of a rendered form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormInput {
    pub label: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub required: bool,
    pub disabled: bool,
    pub value: String,
    pub error: String,
    pub options: Vec<SelectOption>,
}

impl FormInput {
    fn new(kind: &str, label: &str, name: &str) -> Self {
        Self {
            label: label.to_string(),
            name: name.to_string(),
            kind: kind.to_string(),
            required: false,
            disabled: false,
            value: String::new(),
            error: String::new(),
            options: Vec::new(),
        }
    }

    pub fn text(label: &str, name: &str) -> Self {
        Self::new("text", label, name)
    }

    pub fn email(label: &str, name: &str) -> Self {
        Self::new("email", label, name)
    }

    pub fn password(label: &str, name: &str) -> Self {
        Self::new("password", label, name)
    }

    pub fn url(label: &str, name: &str) -> Self {
        Self::new("url", label, name)
    }

    pub fn file(label: &str, name: &str) -> Self {
        Self::new("file", label, name)
    }

    pub fn hidden(name: &str, value: impl ToString) -> Self {
        Self::new("hidden", "", name).value(value)
    }

    pub fn select(label: &str, name: &str, options: Vec<SelectOption>) -> Self {
        Self {
            options,
            ..Self::new("select", label, name)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn value(mut self, value: impl ToString) -> Self {
        self.value = value.to_string();
        self
    }

    /// Submitted value when there is one, otherwise the stored value.
    pub fn value_or(self, submitted: Option<&str>, stored: impl ToString) -> Self {
        match submitted.filter(|s| !s.is_empty()) {
            Some(value) => self.value(value),
            None => self.value(stored),
        }
    }
}

/// Copy per-field messages onto the matching inputs.
pub fn attach_errors(inputs: &mut [FormInput], errors: &FieldErrors) {
    for input in inputs.iter_mut() {
        if let Some(message) = errors.get(&input.name) {
            input.error = message.to_string();
        }
    }
}

/// Body of the list page delete buttons
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeleteForm {
    pub id: String,
    pub current_page: String,
}

impl DeleteForm {
    /// Page to return to, `1` when missing or garbled.
    pub fn page(&self) -> u32 {
        self.current_page.trim().parse().ok().filter(|p| *p > 0).unwrap_or(1)
    }
}
