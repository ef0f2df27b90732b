//! Cookie sessions for the web UI
//!
//! The session token sits in an HttpOnly `token` cookie. Page handlers
//! take one of the extractors below; each one redirects instead of failing
//! so a browser always lands on a usable page.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue},
    response::{IntoResponse, Redirect, Response},
};

use crate::api::AppState;
use crate::models::{Role, User};
use crate::services::{Requester, ServiceError};
use crate::views::Flash;
use crate::web::flash::FLASH_COOKIE_NAME;
use crate::web::PageError;

pub const TOKEN_COOKIE_NAME: &str = "token";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// `Set-Cookie` value carrying a fresh session token.
pub fn token_cookie(token: &str, max_age_secs: u64, secure: bool) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
        TOKEN_COOKIE_NAME,
        token,
        max_age_secs,
        if secure { "; Secure" } else { "" }
    )
}

/// `Set-Cookie` value removing the session token.
pub fn clear_token_cookie() -> &'static str {
    "token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
}

/// Redirect to the login page, dropping whatever token the browser sent.
pub fn to_login() -> Response {
    (
        [(header::SET_COOKIE, HeaderValue::from_static(clear_token_cookie()))],
        Redirect::to("/login"),
    )
        .into_response()
}

/// Flash messages that arrived with the request
#[derive(Debug, Clone, Default)]
pub struct IncomingFlash {
    pub messages: Vec<Flash>,
    /// The cookie was sent, so the response must clear it
    pub present: bool,
}

impl IncomingFlash {
    fn read(parts: &Parts, state: &AppState) -> Self {
        match get_cookie(&parts.headers, FLASH_COOKIE_NAME) {
            Some(value) if !value.is_empty() => Self {
                messages: state.flash.decode(value),
                present: true,
            },
            _ => Self::default(),
        }
    }
}

/// A signed-in visitor of any role
#[derive(Debug, Clone)]
pub struct WebUser {
    pub user: User,
    pub flash: IncomingFlash,
}

impl WebUser {
    pub fn requester(&self) -> Requester {
        Requester::from(&self.user)
    }

    pub fn role(&self) -> Role {
        self.user.role
    }
}

impl FromRequestParts<AppState> for WebUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = get_cookie(&parts.headers, TOKEN_COOKIE_NAME)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Redirect::to("/login").into_response())?;

        let user = match state.auth.authenticate(token).await {
            Ok(user) => user,
            Err(ServiceError::Internal(e)) => {
                return Err(PageError::from(ServiceError::Internal(e)).into_response())
            }
            Err(_) => {
                tracing::debug!("Rejected web session token");
                return Err(to_login());
            }
        };

        Ok(Self {
            user,
            flash: IncomingFlash::read(parts, state),
        })
    }
}

/// Signed-in teacher or admin. Anybody else is sent home.
#[derive(Debug, Clone)]
pub struct TeacherUser(pub WebUser);

impl FromRequestParts<AppState> for TeacherUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let web_user = WebUser::from_request_parts(parts, state).await?;
        match web_user.role() {
            Role::Teacher | Role::Admin => Ok(Self(web_user)),
            Role::Reader => Err(Redirect::to("/").into_response()),
        }
    }
}

/// Signed-in admin. Anybody else is sent home.
#[derive(Debug, Clone)]
pub struct AdminUser(pub WebUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let web_user = WebUser::from_request_parts(parts, state).await?;
        match web_user.role() {
            Role::Admin => Ok(Self(web_user)),
            _ => Err(Redirect::to("/").into_response()),
        }
    }
}

/// A visitor without a session cookie. Visitors holding one are sent home.
#[derive(Debug, Clone)]
pub struct LoggedOut {
    pub flash: IncomingFlash,
}

impl FromRequestParts<AppState> for LoggedOut {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if get_cookie(&parts.headers, TOKEN_COOKIE_NAME).is_some_and(|t| !t.is_empty()) {
            return Err(Redirect::to("/").into_response());
        }
        Ok(Self {
            flash: IncomingFlash::read(parts, state),
        })
    }
}
