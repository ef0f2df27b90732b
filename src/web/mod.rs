//! Server-rendered web UI
//!
//! Pages are rendered with [`crate::views::Views`] and signed in through the
//! `token` cookie. Failed handlers return a [`PageError`]; the
//! [`render_error_pages`] layer turns it into the themed error page.

pub mod account;
pub mod admin;
pub mod auth;
pub mod flash;
pub mod forms;
pub mod reader;
pub mod session;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
    Router,
};
use tera::Context as TeraContext;

use crate::api::AppState;
use crate::services::error::{MSG_BAD_REQUEST, MSG_NOT_FOUND, MSG_UNAUTHORIZED};
use crate::services::ServiceError;
use crate::views::{Flash, PageVars};
use session::{IncomingFlash, LoggedOut, WebUser};

pub use session::{AdminUser, TeacherUser};

const MSG_SERVER_ERROR: &str = "Internal Server Error";

/// All page routes
pub fn build_web_router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(reader::router())
        .nest("/account", account::router())
        .nest("/admin", admin::router())
}

/// Error page to render in place of a handler's response
#[derive(Debug, Clone)]
pub struct PageError {
    pub status: StatusCode,
    pub message: String,
}

impl PageError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, MSG_NOT_FOUND)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, MSG_SERVER_ERROR)
    }
}

impl From<ServiceError> for PageError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::NotFound(_) => Self::not_found(),
            ServiceError::Conflict(msg) => Self::new(StatusCode::CONFLICT, msg),
            ServiceError::Forbidden(_) | ServiceError::InvalidCredentials => {
                Self::new(StatusCode::UNAUTHORIZED, MSG_UNAUTHORIZED)
            }
            ServiceError::Validation(_)
            | ServiceError::BadRequest(_)
            | ServiceError::InvalidUpload(_) => Self::new(StatusCode::BAD_REQUEST, MSG_BAD_REQUEST),
            ServiceError::Internal(e) => {
                tracing::error!("Page request failed: {:#}", e);
                Self::internal()
            }
        }
    }
}

impl From<anyhow::Error> for PageError {
    fn from(error: anyhow::Error) -> Self {
        tracing::error!("Page request failed: {:#}", error);
        Self::internal()
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let mut response = self.status.into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// Replace responses carrying a [`PageError`] with the rendered error page.
pub async fn render_error_pages(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    let Some(error) = response.extensions().get::<PageError>().cloned() else {
        return response;
    };

    let mut context = TeraContext::new();
    context.insert("status", &error.status.as_u16());
    context.insert("message", &error.message);
    let media = &state.config.media;
    let vars = PageVars::new("none").with_media(&media.avatar_dir, &media.icon_dir);
    let html = match state.views.render_page("error.html", &context, &vars) {
        Ok(html) => html,
        Err(_) => state.views.render_with_fallback("error.html", &context),
    };
    (error.status, Html(html)).into_response()
}

pub type PageResult = Result<Response, PageError>;

/// A page about to be rendered for one visitor
pub struct Page<'a> {
    state: &'a AppState,
    vars: PageVars,
    clear_flash: bool,
}

impl<'a> Page<'a> {
    fn new(state: &'a AppState, vars: PageVars, flash: &IncomingFlash) -> Self {
        let media = &state.config.media;
        Self {
            state,
            vars: vars
                .with_media(&media.avatar_dir, &media.icon_dir)
                .with_flash(flash.messages.clone()),
            clear_flash: flash.present,
        }
    }

    pub fn action(mut self, action: &str) -> Self {
        self.vars = self.vars.with_action(action);
        self
    }

    /// Show `flash` on this page, without a redirect.
    pub fn flash(mut self, flash: Flash) -> Self {
        self.vars.flash.push(flash);
        self
    }

    pub fn render(self, template: &str, context: &TeraContext) -> PageResult {
        let html = self.state.views.render_page(template, context, &self.vars)?;
        let mut response = Html(html).into_response();
        if self.clear_flash {
            response.headers_mut().append(
                header::SET_COOKIE,
                HeaderValue::from_static(flash::clear_cookie()),
            );
        }
        Ok(response)
    }
}

impl WebUser {
    pub fn page<'a>(&self, state: &'a AppState, active_nav: &str) -> Page<'a> {
        Page::new(
            state,
            PageVars::new(active_nav).with_user(&self.user),
            &self.flash,
        )
    }
}

impl LoggedOut {
    pub fn page<'a>(&self, state: &'a AppState, active_nav: &str) -> Page<'a> {
        Page::new(state, PageVars::new(active_nav), &self.flash)
    }
}

/// Redirect and show `message` on the page the browser lands on.
pub fn redirect_with_flash(state: &AppState, to: &str, message: Flash) -> Response {
    let mut response = Redirect::to(to).into_response();
    let cookie = state.flash.set_cookie(&[message], state.secure_cookies());
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::warn!("Dropping flash message: {}", e),
    }
    response
}

/// Path of the page the request came from, `fallback` when there is none.
/// Only same-site paths are returned.
pub fn referer_path(headers: &HeaderMap, fallback: &str) -> String {
    let Some(referer) = headers.get(header::REFERER).and_then(|v| v.to_str().ok()) else {
        return fallback.to_string();
    };
    let path = match referer.split_once("://") {
        Some((_, rest)) => rest.find('/').map(|i| &rest[i..]).unwrap_or("/"),
        None => referer,
    };
    if path.starts_with('/') && !path.starts_with("//") {
        path.to_string()
    } else {
        fallback.to_string()
    }
}

/// Id from a path segment; anything unparseable is a missing page.
pub fn path_id(raw: &str) -> Result<i64, PageError> {
    crate::services::parse_id(raw).ok_or_else(PageError::not_found)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_referer(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::REFERER, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_referer_path() {
        assert_eq!(
            referer_path(&with_referer("http://localhost:8080/topics/3?x=1"), "/stars"),
            "/topics/3?x=1"
        );
        assert_eq!(referer_path(&with_referer("http://localhost:8080"), "/stars"), "/");
        assert_eq!(referer_path(&with_referer("/playlists"), "/stars"), "/playlists");
        assert_eq!(referer_path(&with_referer("//evil.example"), "/stars"), "/stars");
        assert_eq!(referer_path(&HeaderMap::new(), "/stars"), "/stars");
    }

    #[test]
    fn test_service_errors_to_pages() {
        assert_eq!(
            PageError::from(ServiceError::not_found("Video was not found.")).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            PageError::from(ServiceError::forbidden("nope")).status,
            StatusCode::UNAUTHORIZED
        );
        let internal = PageError::from(ServiceError::Internal(anyhow::anyhow!("db down")));
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.message, MSG_SERVER_ERROR);
    }

    #[test]
    fn test_path_id() {
        assert_eq!(path_id("12").unwrap(), 12);
        assert_eq!(path_id("x").unwrap_err().status, StatusCode::NOT_FOUND);
    }
}
