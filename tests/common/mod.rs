#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use vidlearn::{
    api::{build_router, AppState},
    config::{AdminBootstrap, Config},
    db::{create_test_pool, migrations::run_migrations},
};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const PASSWORD: &str = "secret123";

/// Router over a migrated in-memory database. Uploads go to a temporary
/// public directory that lives as long as the returned guard.
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    _public: TempDir,
}

pub async fn create_test_app() -> TestApp {
    let public = TempDir::new().expect("Failed to create public dir");
    let mut config = Config::default();
    config.media.public_dir = public.path().to_path_buf();
    config.auth.token_secret = "test-token-secret".to_string();

    let pool = create_test_pool().await.expect("Failed to open test database");
    run_migrations(&pool).await.expect("Failed to run migrations");
    let state = AppState::new(pool, config).expect("Failed to build state");
    state
        .auth
        .bootstrap_admin(&AdminBootstrap {
            email: ADMIN_EMAIL.to_string(),
            password: PASSWORD.to_string(),
            username: "admin".to_string(),
        })
        .await
        .expect("Failed to create admin");

    TestApp {
        app: build_router(state.clone()),
        state,
        _public: public,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .json(
                "POST",
                "/api/login",
                None,
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, PASSWORD).await
    }

    /// Register a reader and return its token.
    pub async fn reader_token(&self, username: &str) -> String {
        let (status, _) = self
            .json("POST", "/api/register", None, account(username))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        self.login(&format!("{}@example.com", username), PASSWORD)
            .await
    }

    /// Create a teacher through the admin API; returns its id and token.
    pub async fn teacher(&self, admin: &str, username: &str) -> (i64, String) {
        let (status, body) = self
            .json("POST", "/api/teachers", Some(admin), account(username))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        let id = body["id"].as_i64().unwrap();
        let token = self
            .login(&format!("{}@example.com", username), PASSWORD)
            .await;
        (id, token)
    }

    /// Create a topic with a small png icon.
    pub async fn topic(&self, admin: &str, name: &str) -> i64 {
        let request = multipart_request(
            "POST",
            "/api/topics",
            admin,
            &[("name", name)],
            Some(("icon", "icon.png", "image/png", PNG_BYTES)),
        );
        let (status, body) = self.send(request).await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().unwrap()
    }

    pub async fn video(&self, admin: &str, name: &str, topic_id: i64, teacher_id: i64) -> i64 {
        let (status, body) = self
            .json(
                "POST",
                "/api/videos",
                Some(admin),
                serde_json::json!({
                    "name": name,
                    "thumbnail": "https://img.youtube.com/vi/abc/0.jpg",
                    "youtube_id": "abc123",
                    "topic_id": topic_id,
                    "user_id": teacher_id,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().unwrap()
    }
}

pub fn account(username: &str) -> Value {
    serde_json::json!({
        "firstname": "Test",
        "lastname": username,
        "username": username,
        "email": format!("{}@example.com", username),
        "password": PASSWORD,
    })
}

/// 1x1 png
pub const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0a, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

const BOUNDARY: &str = "vidlearn-test-boundary";

pub fn multipart_request(
    method: &str,
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((name, filename, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, name, filename, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(body))
        .unwrap()
}
