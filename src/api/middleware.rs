//! API middleware
//!
//! Contains:
//! - the shared application state
//! - bearer token authentication
//! - role gates
//! - the JSON error type every API handler returns

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::responses::{MessageResponse, MSG_INTERNAL_ERROR};
use crate::config::Config;
use crate::db::repositories::{
    SqlxPlaylistRepository, SqlxTopicRepository, SqlxUserRepository, SqlxVideoRepository,
    SqlxVideostarRepository,
};
use crate::db::DbPool;
use crate::models::{Role, User};
use crate::services::error::{MSG_BAD_REQUEST, MSG_UNAUTHORIZED};
use crate::services::{
    AuthService, FieldErrors, MediaStore, PlaylistService, Requester, ServiceError, StarService,
    TokenService, TopicService, UserService, VideoService,
};
use crate::views::Views;
use crate::web::flash::FlashSigner;

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub topics: Arc<TopicService>,
    pub videos: Arc<VideoService>,
    pub playlists: Arc<PlaylistService>,
    pub stars: Arc<StarService>,
    pub views: Arc<Views>,
    pub flash: FlashSigner,
}

impl AppState {
    /// Wire repositories, services and the view engine on top of `pool`.
    pub fn new(pool: DbPool, config: Config) -> anyhow::Result<Self> {
        let secret = signing_secret(&config.auth.token_secret);
        let media = MediaStore::new(config.media.clone());

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let topic_repo = SqlxTopicRepository::boxed(pool.clone());
        let video_repo = SqlxVideoRepository::boxed(pool.clone());
        let playlist_repo = SqlxPlaylistRepository::boxed(pool.clone());
        let star_repo = SqlxVideostarRepository::boxed(pool.clone());

        let users = Arc::new(UserService::new(user_repo.clone(), media.clone()));
        let tokens = TokenService::new(&secret, config.auth.token_ttl_seconds);
        let auth = Arc::new(AuthService::new(users.clone(), tokens));
        let topics = Arc::new(TopicService::new(
            topic_repo.clone(),
            video_repo.clone(),
            media,
        ));
        let videos = Arc::new(VideoService::new(
            video_repo.clone(),
            topic_repo,
            user_repo.clone(),
        ));
        let playlists = Arc::new(PlaylistService::new(
            playlist_repo,
            video_repo.clone(),
            user_repo,
        ));
        let stars = Arc::new(StarService::new(star_repo, video_repo));

        let views = Arc::new(Views::new(config.templates.path.as_deref())?);
        let flash = FlashSigner::new(&secret)?;

        Ok(Self {
            pool,
            config: Arc::new(config),
            auth,
            users,
            topics,
            videos,
            playlists,
            stars,
            views,
            flash,
        })
    }

    pub fn secure_cookies(&self) -> bool {
        self.config.auth.secure_cookies
    }
}

/// The configured secret, or a random one when none is set.
fn signing_secret(configured: &str) -> Vec<u8> {
    if !configured.is_empty() {
        return configured.as_bytes().to_vec();
    }
    tracing::warn!(
        "auth.token_secret is not set; using a random secret, sessions end on restart"
    );
    let mut secret = Uuid::new_v4().as_bytes().to_vec();
    secret.extend_from_slice(Uuid::new_v4().as_bytes());
    secret
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl AuthenticatedUser {
    pub fn requester(&self) -> Requester {
        Requester::from(&self.0)
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(ApiError::unauthorized)
    }
}

/// Error returned by API handlers
#[derive(Debug)]
pub enum ApiError {
    /// Status with a `{message}` body
    Message(StatusCode, String),
    /// 400 with a field to message map as body
    Fields(FieldErrors),
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Message(status, message.into())
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, MSG_UNAUTHORIZED)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn generic_bad_request() -> Self {
        Self::bad_request(MSG_BAD_REQUEST)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal_error() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL_ERROR)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Message(status, _) => *status,
            Self::Fields(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Validation(fields) => Self::Fields(fields),
            ServiceError::BadRequest(msg) | ServiceError::InvalidUpload(msg) => {
                Self::bad_request(msg)
            }
            ServiceError::Conflict(msg) => Self::new(StatusCode::CONFLICT, msg),
            ServiceError::NotFound(msg) => Self::not_found(msg),
            ServiceError::Forbidden(msg) => Self::new(StatusCode::UNAUTHORIZED, msg),
            ServiceError::InvalidCredentials => Self::unauthorized(),
            ServiceError::Internal(e) => {
                tracing::error!("API request failed: {:#}", e);
                Self::internal_error()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Message(status, message) => {
                (status, Json(MessageResponse::new(message))).into_response()
            }
            Self::Fields(fields) => (StatusCode::BAD_REQUEST, Json(fields)).into_response(),
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Authentication middleware
pub async fn require_token(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or_else(ApiError::unauthorized)?;

    let user = state.auth.authenticate(token).await.map_err(|e| match e {
        ServiceError::Internal(_) => ApiError::from(e),
        _ => ApiError::unauthorized(),
    })?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

fn user_role(request: &Request) -> Result<Role, ApiError> {
    request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|user| user.0.role)
        .ok_or_else(ApiError::unauthorized)
}

/// Teacher gate; admins pass too
pub async fn require_teacher(request: Request, next: Next) -> Result<Response, ApiError> {
    match user_role(&request)? {
        Role::Teacher | Role::Admin => Ok(next.run(request).await),
        Role::Reader => Err(ApiError::unauthorized()),
    }
}

/// Admin gate
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    match user_role(&request)? {
        Role::Admin => Ok(next.run(request).await),
        _ => Err(ApiError::unauthorized()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_service_error_status() {
        let cases = [
            (ServiceError::bad_request("x"), StatusCode::BAD_REQUEST),
            (ServiceError::conflict("x"), StatusCode::CONFLICT),
            (ServiceError::not_found("x"), StatusCode::NOT_FOUND),
            (ServiceError::forbidden("x"), StatusCode::UNAUTHORIZED),
            (ServiceError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (ServiceError::InvalidUpload("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::Validation(FieldErrors::new()), StatusCode::BAD_REQUEST),
            (
                ServiceError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status(), status);
        }
    }

    #[test]
    fn test_signing_secret() {
        assert_eq!(signing_secret("abc"), b"abc".to_vec());
        let a = signing_secret("");
        let b = signing_secret("");
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
