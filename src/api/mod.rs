//! API layer - HTTP handlers and routing
//!
//! The JSON API lives under `/api` and authenticates with bearer tokens.
//! [`build_router`] mounts it next to the server-rendered pages from
//! [`crate::web`] and serves static files for everything else.

pub mod auth;
pub mod common;
pub mod middleware;
pub mod playlists;
pub mod responses;
pub mod static_files;
pub mod teachers;
pub mod topics;
pub mod upload;
pub mod videos;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::error::MSG_NOT_FOUND;
use responses::MessageResponse;

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Room for multipart boundaries and text fields on top of the file itself
const BODY_LIMIT_SLACK: usize = 64 * 1024;

/// Build the `/api` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes
    let admin_routes = Router::new()
        .route(
            "/teachers",
            post(teachers::create_teacher).delete(teachers::delete_teacher),
        )
        .route(
            "/videos",
            post(videos::create_video).delete(videos::delete_video),
        )
        .route(
            "/topics",
            post(topics::create_topic)
                .put(topics::update_topic)
                .delete(topics::delete_topic),
        )
        .route(
            "/playlists",
            post(playlists::create_playlist).delete(playlists::delete_playlist),
        )
        .route("/playlists/addVideo", post(playlists::add_video))
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_token,
        ));

    // Teacher routes (admins pass the teacher gate too)
    let teacher_routes = Router::new()
        .route("/teachers", put(teachers::update_teacher))
        .route("/videos", put(videos::update_video))
        .route("/playlists", put(playlists::update_playlist))
        .route_layer(axum_middleware::from_fn(middleware::require_teacher))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_token,
        ));

    // Any signed-in user
    let reader_routes = Router::new()
        .route("/teachers", get(teachers::list_teachers))
        .route("/teachers/{id}", get(teachers::get_teacher))
        .route("/videos", get(videos::list_videos))
        .route("/videos/{id}", get(videos::get_video))
        .route("/topics", get(topics::list_topics))
        .route("/topics/{id}", get(topics::get_topic))
        .route("/playlists", get(playlists::list_playlists))
        .route("/playlists/{id}", get(playlists::get_playlist))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_token,
        ));

    Router::new()
        .merge(auth::router())
        .merge(reader_routes)
        .merge(teacher_routes)
        .merge(admin_routes)
        .fallback(api_not_found)
}

async fn api_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(MessageResponse::new(MSG_NOT_FOUND)))
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    match config.server.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(_) => tracing::warn!(
            "Ignoring invalid CORS origin {:?}",
            config.server.cors_origin
        ),
    }

    let body_limit = usize::try_from(config.media.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(BODY_LIMIT_SLACK);

    Router::new()
        .merge(crate::web::build_web_router())
        .nest("/api", build_api_router(state.clone()).layer(cors))
        .fallback(static_files::serve_static)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            crate::web::render_error_pages,
        ))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
