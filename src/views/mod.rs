//! View engine
//!
//! Server-rendered pages use Tera. Templates are compiled into the binary
//! from `templates/`; a directory configured under `templates.path` can
//! override any of them by name.

use anyhow::{Context, Result};
use chrono::Datelike;
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fs;
use std::path::Path;
use tera::{Context as TeraContext, Tera};

use crate::models::User;

mod error;

pub use error::ViewError;

#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct EmbeddedTemplates;

/// Template renderer shared by every page handler
pub struct Views {
    tera: Tera,
}

impl Views {
    /// Load the built-in templates, then any `.html` files under
    /// `override_dir` (same relative names replace built-in ones).
    pub fn new(override_dir: Option<&Path>) -> Result<Self> {
        let mut templates = embedded_templates()?;

        if let Some(dir) = override_dir {
            if dir.is_dir() {
                let mut overrides = Vec::new();
                collect_templates_from_dir(dir, dir, &mut overrides)?;
                tracing::info!("Loaded {} template overrides from {:?}", overrides.len(), dir);
                for (name, content) in overrides {
                    templates.retain(|(existing, _)| existing != &name);
                    templates.push((name, content));
                }
            } else {
                tracing::warn!("Template directory {:?} not found, using built-in templates", dir);
            }
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(templates)
            .map_err(|e| ViewError::TemplateError(error_chain(&e)))?;
        Ok(Self { tera })
    }

    pub fn has_template(&self, template: &str) -> bool {
        self.tera.get_template_names().any(|name| name == template)
    }

    /// Render a template with context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        self.tera.render(template, context).map_err(|e| {
            ViewError::TemplateError(format!(
                "Failed to render '{}': {}",
                template,
                error_chain(&e)
            ))
            .into()
        })
    }

    /// Render a page with the shared variables merged into `context`.
    pub fn render_page(
        &self,
        template: &str,
        context: &TeraContext,
        vars: &PageVars,
    ) -> Result<String> {
        let mut full_context = context.clone();
        full_context.insert("role", &vars.role);
        full_context.insert("activeNav", &vars.active_nav);
        full_context.insert("action", &vars.action);
        full_context.insert("current_user", &vars.current_user);
        full_context.insert("flash", &vars.flash);
        full_context.insert("year", &vars.year);
        full_context.insert("avatarBase", &vars.avatar_base);
        full_context.insert("iconBase", &vars.icon_base);
        self.render(template, &full_context)
    }

    /// Render a template, falling back to `error.html` and finally to a
    /// bare HTML page. Never fails.
    pub fn render_with_fallback(&self, template: &str, context: &TeraContext) -> String {
        match self.render(template, context) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!("Failed to render template '{}': {}", template, e);
                let mut error_context = context.clone();
                error_context.insert("status", &500);
                error_context.insert("message", "Internal Server Error");
                match self.render("error.html", &error_context) {
                    Ok(html) => html,
                    Err(error_template_err) => {
                        tracing::error!("Failed to render error template: {}", error_template_err);
                        simple_error_page(500, "Internal Server Error")
                    }
                }
            }
        }
    }
}

fn error_chain(e: &tera::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}

fn embedded_templates() -> Result<Vec<(String, String)>> {
    let mut templates = Vec::new();
    for name in EmbeddedTemplates::iter() {
        let file = EmbeddedTemplates::get(&name)
            .with_context(|| format!("Embedded template vanished: {}", name))?;
        let content = String::from_utf8(file.data.into_owned())
            .with_context(|| format!("Template is not UTF-8: {}", name))?;
        templates.push((name.to_string(), content));
    }
    Ok(templates)
}

fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<()> {
    for entry in fs::read_dir(current_path).map_err(ViewError::from)? {
        let path = entry.map_err(ViewError::from)?.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().is_some_and(|ext| ext == "html") {
            let relative_path = path.strip_prefix(base_path).map_err(|_| {
                ViewError::TemplateError("Failed to get relative path".to_string())
            })?;
            let template_name = relative_path.to_string_lossy().replace('\\', "/");
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template: {:?}", path))?;
            templates.push((template_name, content));
        }
    }
    Ok(())
}

/// Last-resort page when even `error.html` fails
fn simple_error_page(status: u16, message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{status} {message}</title>
</head>
<body>
    <h1>{status}</h1>
    <p>{message}</p>
    <p><a href="/">Back to home</a></p>
</body>
</html>"#
    )
}

/// A one-shot message shown on the next page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    /// Bootstrap alert type: `success`, `danger`, `info`
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: "success".to_string(),
            message: message.into(),
        }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            kind: "danger".to_string(),
            message: message.into(),
        }
    }
}

/// Signed-in user as the navigation bar shows it
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub avatar: Option<String>,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username().to_string(),
            avatar: user.meta.avatar.clone(),
        }
    }
}

/// Variables every page template receives
#[derive(Debug, Clone, Serialize)]
pub struct PageVars {
    /// Role label of the signed-in user, `None` when signed out
    pub role: Option<String>,
    /// Highlighted navigation entry
    pub active_nav: String,
    /// Sub-section of the active entry (`videos`, `edit`, ...)
    pub action: Option<String>,
    pub current_user: Option<CurrentUser>,
    pub flash: Vec<Flash>,
    pub year: i32,
    /// URL prefixes of uploaded avatars and topic icons
    pub avatar_base: String,
    pub icon_base: String,
}

impl PageVars {
    pub fn new(active_nav: impl Into<String>) -> Self {
        Self {
            role: None,
            active_nav: active_nav.into(),
            action: None,
            current_user: None,
            flash: Vec::new(),
            year: chrono::Utc::now().year(),
            avatar_base: "/images/avatars".to_string(),
            icon_base: "/images/topics".to_string(),
        }
    }

    pub fn with_media(mut self, avatar_dir: &str, icon_dir: &str) -> Self {
        self.avatar_base = format!("/{}", avatar_dir.trim_matches('/'));
        self.icon_base = format!("/{}", icon_dir.trim_matches('/'));
        self
    }

    pub fn with_user(mut self, user: &User) -> Self {
        self.role = Some(user.role.label().to_string());
        self.current_user = Some(CurrentUser::from(user));
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_flash(mut self, flash: Vec<Flash>) -> Self {
        self.flash = flash;
        self
    }
}

#[cfg(test)]
mod tests;
