//! Dashboard pages
//!
//! Videos and playlists are open to teachers (who only see their own) and
//! admins. Topics and users are admin only. Every section has a paged list,
//! a create page, an edit page and a delete action that returns to the
//! list page the button was on.

mod playlists;
mod topics;
mod users;
mod videos;

use axum::{
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::api::AppState;
use crate::models::{ListParams, Paged};
use crate::services::{ServiceError, ServiceResult};
use crate::views::Flash;
use crate::web::forms::FormInput;
use crate::web::session::WebUser;
use crate::web::{redirect_with_flash, PageResult};

/// A record to work on, or the response to send instead
pub type Loaded<T> = Result<T, Response>;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::to("/admin/videos") }))
        .nest("/videos", videos::router())
        .nest("/playlists", playlists::router())
        .nest("/topics", topics::router())
        .nest("/users", users::router())
}

/// Query string of the list pages
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub page: Option<String>,
    pub topic: Option<String>,
    pub name: Option<String>,
    pub username: Option<String>,
}

impl ListQuery {
    pub fn params(&self) -> ListParams {
        ListParams::from_query(self.page.as_deref())
    }

    pub fn filter(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

/// Cut `items` to the requested page.
pub fn paged<T>(items: Vec<T>, query: &ListQuery) -> Paged<T> {
    Paged::from_vec(items, query.params())
}

/// Render `admin/form.html`.
pub fn render_form(
    state: &AppState,
    session: &WebUser,
    section: &str,
    title: &str,
    form_action: &str,
    inputs: &[FormInput],
    handler_errors: &[Flash],
) -> PageResult {
    let mut context = TeraContext::new();
    context.insert("title", title);
    context.insert("formAction", form_action);
    context.insert("multipart", &inputs.iter().any(|i| i.kind == "file"));
    context.insert("inputs", inputs);
    context.insert("handlerErrors", handler_errors);
    session
        .page(state, "admin")
        .action(section)
        .render("admin/form.html", &context)
}

/// Finish a delete: back to the list page on success, to the list with a
/// message when the item is gone or belongs to someone else.
pub fn after_delete(
    state: &AppState,
    list: &str,
    page: u32,
    result: ServiceResult<()>,
) -> PageResult {
    match result {
        Ok(()) => Ok(Redirect::to(&format!("{}?page={}", list, page)).into_response()),
        Err(ServiceError::NotFound(msg)) | Err(ServiceError::Forbidden(msg)) => {
            Ok(redirect_with_flash(state, list, Flash::danger(msg)))
        }
        Err(e) => Err(e.into()),
    }
}
