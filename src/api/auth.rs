//! Authentication API endpoints
//!
//! - POST /api/login - exchange email and password for a bearer token
//! - POST /api/register - create a reader account

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::TokenResponse;
use crate::models::User;
use crate::services::validation::{LoginForm, RegisterForm};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
}

/// POST /api/login
///
/// 400 when either field is missing, 404 for an unknown email and 401 for
/// a wrong password.
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::generic_bad_request());
    }

    let (user, token) = state.auth.login(body.email.trim(), &body.password).await?;
    tracing::info!("User {} signed in through the API", user.id);
    Ok(Json(TokenResponse { token }))
}

/// POST /api/register
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterForm>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.auth.register(&body).await?;
    tracing::info!("Registered user {} through the API", user.username());
    Ok((StatusCode::CREATED, Json(user)))
}
