//! Configuration management
//!
//! Configuration is loaded from `config.yml` and then overridden by
//! `VIDLEARN_*` environment variables. Every field has a default, so a
//! missing or empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
    /// Account created at startup when no admin exists
    #[serde(default)]
    pub admin: Option<AdminBootstrap>,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin for the JSON API
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path, `sqlite:` URL, or `:memory:`
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/vidlearn.db".to_string()
}

/// Token and cookie settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for session tokens and flash cookies. Empty means a
    /// random secret is generated at startup, which logs everyone out on
    /// restart.
    #[serde(default)]
    pub token_secret: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_seconds: u64,
    /// Mark cookies `Secure` (serve over HTTPS only)
    #[serde(default)]
    pub secure_cookies: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: String::new(),
            token_ttl_seconds: default_token_ttl(),
            secure_cookies: false,
        }
    }
}

fn default_token_ttl() -> u64 {
    24 * 60 * 60
}

/// Static files and uploaded images
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory served as static files
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,
    /// Avatar directory, relative to `public_dir`
    #[serde(default = "default_avatar_dir")]
    pub avatar_dir: String,
    /// Topic icon directory, relative to `public_dir`
    #[serde(default = "default_icon_dir")]
    pub icon_dir: String,
    /// Maximum upload size in bytes (default: 5MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Allowed image MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            public_dir: default_public_dir(),
            avatar_dir: default_avatar_dir(),
            icon_dir: default_icon_dir(),
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_avatar_dir() -> String {
    "images/avatars".to_string()
}

fn default_icon_dir() -> String {
    "images/topics".to_string()
}

fn default_max_file_size() -> u64 {
    5 * 1024 * 1024
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/png".to_string(),
        "image/jpg".to_string(),
        "image/jpeg".to_string(),
    ]
}

impl MediaConfig {
    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == mime_type)
    }

    pub fn avatar_path(&self) -> PathBuf {
        self.public_dir.join(&self.avatar_dir)
    }

    pub fn icon_path(&self) -> PathBuf {
        self.public_dir.join(&self.icon_dir)
    }
}

/// Template configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Directory of `.html` templates replacing the built-in ones
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Initial administrator account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
    #[serde(default = "default_admin_username")]
    pub username: String,
}

fn default_admin_username() -> String {
    "admin".to_string()
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// A missing or empty file gives the default configuration. Invalid
    /// YAML is an error carrying the line and column.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Recognised variables:
    /// - VIDLEARN_SERVER_HOST, VIDLEARN_SERVER_PORT, VIDLEARN_SERVER_CORS_ORIGIN
    /// - VIDLEARN_DATABASE_URL
    /// - VIDLEARN_AUTH_TOKEN_SECRET, VIDLEARN_AUTH_TOKEN_TTL_SECONDS,
    ///   VIDLEARN_AUTH_SECURE_COOKIES
    /// - VIDLEARN_MEDIA_PUBLIC_DIR
    /// - VIDLEARN_TEMPLATES_PATH
    /// - VIDLEARN_ADMIN_EMAIL, VIDLEARN_ADMIN_PASSWORD
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("VIDLEARN_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("VIDLEARN_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("VIDLEARN_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(url) = std::env::var("VIDLEARN_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(secret) = std::env::var("VIDLEARN_AUTH_TOKEN_SECRET") {
            self.auth.token_secret = secret;
        }
        if let Ok(ttl) = std::env::var("VIDLEARN_AUTH_TOKEN_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                self.auth.token_ttl_seconds = ttl;
            }
        }
        if let Ok(secure) = std::env::var("VIDLEARN_AUTH_SECURE_COOKIES") {
            if let Ok(secure) = secure.parse::<bool>() {
                self.auth.secure_cookies = secure;
            }
        }

        if let Ok(dir) = std::env::var("VIDLEARN_MEDIA_PUBLIC_DIR") {
            self.media.public_dir = PathBuf::from(dir);
        }
        if let Ok(path) = std::env::var("VIDLEARN_TEMPLATES_PATH") {
            self.templates.path = Some(PathBuf::from(path));
        }

        // Both are needed to bootstrap an admin
        if let (Ok(email), Ok(password)) = (
            std::env::var("VIDLEARN_ADMIN_EMAIL"),
            std::env::var("VIDLEARN_ADMIN_PASSWORD"),
        ) {
            let username = self
                .admin
                .as_ref()
                .map(|a| a.username.clone())
                .unwrap_or_else(default_admin_username);
            self.admin = Some(AdminBootstrap {
                email,
                password,
                username,
            });
        }
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port must not be 0".to_string(),
            ));
        }
        if self.auth.token_ttl_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "auth.token_ttl_seconds must be greater than 0".to_string(),
            ));
        }
        if self.media.allowed_types.is_empty() {
            return Err(ConfigError::ValidationError(
                "media.allowed_types must list at least one MIME type".to_string(),
            ));
        }
        Ok(())
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Tests that touch environment variables hold this lock.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ENV_VARS: &[&str] = &[
        "VIDLEARN_SERVER_HOST",
        "VIDLEARN_SERVER_PORT",
        "VIDLEARN_SERVER_CORS_ORIGIN",
        "VIDLEARN_DATABASE_URL",
        "VIDLEARN_AUTH_TOKEN_SECRET",
        "VIDLEARN_AUTH_TOKEN_TTL_SECONDS",
        "VIDLEARN_AUTH_SECURE_COOKIES",
        "VIDLEARN_MEDIA_PUBLIC_DIR",
        "VIDLEARN_TEMPLATES_PATH",
        "VIDLEARN_ADMIN_EMAIL",
        "VIDLEARN_ADMIN_PASSWORD",
    ];

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        super::CONFIG_ENV_MUTEX
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = std::path::Path::new("nonexistent_config.yml");
        let config = Config::load(path).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, "data/vidlearn.db");
        assert_eq!(config.auth.token_ttl_seconds, 86400);
        assert!(config.auth.token_secret.is_empty());
        assert!(!config.auth.secure_cookies);
        assert_eq!(config.media.public_dir, PathBuf::from("public"));
        assert_eq!(config.media.max_file_size, 5 * 1024 * 1024);
        assert!(config.templates.path.is_none());
        assert!(config.admin.is_none());
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 3000\nauth:\n  secure_cookies: true\n").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.port, 3000);
        assert!(config.auth.secure_cookies);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.auth.token_ttl_seconds, 86400);
    }

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
server:
  host: "127.0.0.1"
  port: 9000
database:
  url: "sqlite::memory:"
auth:
  token_secret: "s3cret"
  token_ttl_seconds: 3600
media:
  public_dir: "static"
  avatar_dir: "a"
  icon_dir: "i"
  max_file_size: 1024
  allowed_types: ["image/png"]
templates:
  path: "my_templates"
admin:
  email: "root@example.com"
  password: "changeme123"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.auth.token_secret, "s3cret");
        assert_eq!(config.auth.token_ttl_seconds, 3600);
        assert_eq!(config.media.avatar_path(), PathBuf::from("static/a"));
        assert_eq!(config.media.icon_path(), PathBuf::from("static/i"));
        assert!(config.media.is_type_allowed("image/png"));
        assert!(!config.media.is_type_allowed("image/jpeg"));
        assert_eq!(config.templates.path, Some(PathBuf::from("my_templates")));

        let admin = config.admin.unwrap();
        assert_eq!(admin.email, "root@example.com");
        assert_eq!(admin.username, "admin");
    }

    #[test]
    fn test_load_invalid_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: not_a_number\n").unwrap();

        let result = Config::load(file.path());

        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("parse"));
    }

    #[test]
    fn test_load_malformed_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  host: [invalid yaml").unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let _guard = lock_env();
        clear_env();

        std::env::set_var("VIDLEARN_SERVER_PORT", "9999");
        std::env::set_var("VIDLEARN_DATABASE_URL", "test.db");
        std::env::set_var("VIDLEARN_AUTH_TOKEN_SECRET", "from-env");
        std::env::set_var("VIDLEARN_AUTH_SECURE_COOKIES", "true");
        std::env::set_var("VIDLEARN_ADMIN_EMAIL", "boss@example.com");
        std::env::set_var("VIDLEARN_ADMIN_PASSWORD", "password123");

        let path = std::path::Path::new("nonexistent_config.yml");
        let config = Config::load_with_env(path).unwrap();

        clear_env();

        assert_eq!(config.server.port, 9999);
        assert_eq!(config.database.url, "test.db");
        assert_eq!(config.auth.token_secret, "from-env");
        assert!(config.auth.secure_cookies);
        let admin = config.admin.unwrap();
        assert_eq!(admin.email, "boss@example.com");
        assert_eq!(admin.username, "admin");
    }

    #[test]
    fn test_env_invalid_numbers_ignored() {
        let _guard = lock_env();
        clear_env();

        std::env::set_var("VIDLEARN_SERVER_PORT", "not_a_port");
        std::env::set_var("VIDLEARN_AUTH_TOKEN_TTL_SECONDS", "-5");
        std::env::set_var("VIDLEARN_AUTH_SECURE_COOKIES", "yes please");

        let path = std::path::Path::new("nonexistent_config.yml");
        let config = Config::load_with_env(path).unwrap();

        clear_env();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.token_ttl_seconds, 86400);
        assert!(!config.auth.secure_cookies);
    }

    #[test]
    fn test_env_admin_needs_both_values() {
        let _guard = lock_env();
        clear_env();

        std::env::set_var("VIDLEARN_ADMIN_EMAIL", "boss@example.com");
        let config = Config::load_with_env(std::path::Path::new("nonexistent_config.yml")).unwrap();

        clear_env();
        assert!(config.admin.is_none());
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.server.port = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        let mut config = Config::default();
        config.auth.token_ttl_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.media.allowed_types.clear();
        assert!(config.validate().is_err());
    }
}
