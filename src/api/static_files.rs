//! Static file serving
//!
//! Files are looked up in the configured public directory first (uploaded
//! avatars and topic icons live there), then in the assets compiled into
//! the binary. Anything else is the themed 404 page.

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use rust_embed::RustEmbed;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::api::middleware::AppState;
use crate::web::PageError;

/// Stylesheets and default images shipped with the binary
#[derive(RustEmbed)]
#[folder = "public/"]
#[include = "*"]
struct PublicAssets;

/// Serve static files based on path
pub async fn serve_static(State(state): State<AppState>, uri: Uri) -> Response {
    let path = uri.path();
    // %20 and friends appear in uploaded file names
    let decoded = urlencoding::decode(path).unwrap_or_else(|_| path.into());
    let Some(relative) = safe_relative(decoded.as_ref()) else {
        return PageError::not_found().into_response();
    };
    let relative_str = relative.to_string_lossy().replace('\\', "/");

    let on_disk = state.config.media.public_dir.join(&relative);
    if let Ok(contents) = fs::read(&on_disk).await {
        return build_response(&relative_str, contents);
    }

    if let Some(content) = PublicAssets::get(&relative_str) {
        return build_response(&relative_str, content.data.into_owned());
    }

    PageError::not_found().into_response()
}

/// Request path as a relative file path. `None` for the root, directories
/// and anything trying to climb out of the public directory.
fn safe_relative(path: &str) -> Option<PathBuf> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with('/') {
        return None;
    }
    let mut relative = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(relative)
}

fn build_response(path: &str, data: Vec<u8>) -> Response {
    let content_type = get_content_type(path);
    let cache_control = if path.starts_with("css/") {
        "public, max-age=3600"
    } else {
        "public, max-age=86400"
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, cache_control),
        ],
        Body::from(data),
    )
        .into_response()
}

/// Get content type from file extension
fn get_content_type(path: &str) -> &'static str {
    match path.rsplit('.').next().unwrap_or("") {
        "html" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "webp" => "image/webp",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}
