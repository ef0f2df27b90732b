//! Uploaded images
//!
//! Topic icons live at `{public}/{icon_dir}/{slug}.png` and avatars at
//! `{public}/{avatar_dir}/{uuid}.jpg`. Files are written as received.

use anyhow::Context;
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

use crate::config::MediaConfig;
use crate::models::DEFAULT_AVATAR_FILENAME;
use crate::services::error::{ServiceError, ServiceResult};

pub const ICON_EXT: &str = "png";
pub const AVATAR_EXT: &str = "jpg";

pub const MSG_BAD_IMAGE_TYPE: &str = "Please upload a png, jpg or jpeg file.";

/// A file taken from a multipart form
#[derive(Debug, Clone)]
pub struct Upload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            content_type: content_type.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    config: MediaConfig,
}

impl MediaStore {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }

    /// Type and size checks shared by icons and avatars.
    pub fn check(&self, upload: &Upload) -> ServiceResult<()> {
        if !self.config.is_type_allowed(&upload.content_type) {
            return Err(ServiceError::InvalidUpload(MSG_BAD_IMAGE_TYPE.to_string()));
        }
        if upload.bytes.len() as u64 > self.config.max_file_size {
            return Err(ServiceError::InvalidUpload(format!(
                "File too large. Maximum size: {} MB",
                self.config.max_file_size / 1024 / 1024
            )));
        }
        Ok(())
    }

    pub fn icon_filename(slug: &str) -> String {
        format!("{}.{}", slug, ICON_EXT)
    }

    /// Write a topic icon and return its filename.
    pub async fn save_icon(&self, slug: &str, upload: &Upload) -> ServiceResult<String> {
        self.check(upload)?;
        let filename = Self::icon_filename(slug);
        write_file(&self.config.icon_path(), &filename, &upload.bytes).await?;
        Ok(filename)
    }

    /// Write an avatar under a fresh name and return that name.
    pub async fn save_avatar(&self, upload: &Upload) -> ServiceResult<String> {
        self.check(upload)?;
        let filename = format!("{}.{}", Uuid::new_v4(), AVATAR_EXT);
        write_file(&self.config.avatar_path(), &filename, &upload.bytes).await?;
        Ok(filename)
    }

    pub async fn remove_icon(&self, filename: &str) {
        remove_file(&self.config.icon_path(), filename).await;
    }

    /// Remove an avatar. The shared default avatar is kept.
    pub async fn remove_avatar(&self, filename: &str) {
        if filename == DEFAULT_AVATAR_FILENAME {
            return;
        }
        remove_file(&self.config.avatar_path(), filename).await;
    }
}

/// Only a bare file name is accepted, so stored names cannot point outside
/// the media directory.
fn is_plain_filename(filename: &str) -> bool {
    !filename.is_empty()
        && Path::new(filename).file_name().and_then(|f| f.to_str()) == Some(filename)
}

async fn write_file(dir: &Path, filename: &str, bytes: &[u8]) -> anyhow::Result<()> {
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create media dir {:?}", dir))?;
    let path = dir.join(filename);
    fs::write(&path, bytes)
        .await
        .with_context(|| format!("Failed to save file {:?}", path))?;
    Ok(())
}

/// Missing files are not an error; anything else is logged and ignored.
async fn remove_file(dir: &Path, filename: &str) {
    if !is_plain_filename(filename) {
        tracing::warn!("Refusing to remove media file with path components: {}", filename);
        return;
    }
    let path = dir.join(filename);
    match fs::remove_file(&path).await {
        Ok(()) => tracing::debug!("Removed media file {:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove media file {:?}: {}", path, e),
    }
}
