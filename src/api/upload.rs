//! Multipart form reading
//!
//! Topic and avatar forms are `multipart/form-data`. [`UploadForm::read`]
//! collects text fields and files by name; a file input left empty by the
//! browser counts as no file.

use axum::extract::Multipart;
use std::collections::HashMap;

use crate::services::{ServiceError, ServiceResult, Upload};

const MSG_BAD_MULTIPART: &str = "Invalid multipart data";

#[derive(Debug, Default)]
pub struct UploadForm {
    texts: HashMap<String, String>,
    files: HashMap<String, Upload>,
}

impl UploadForm {
    /// Read every field. Parts with a file name are files, the rest text.
    pub async fn read(mut multipart: Multipart) -> ServiceResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|_| ServiceError::bad_request(MSG_BAD_MULTIPART))?
        {
            let name = field.name().unwrap_or("").to_string();
            if name.is_empty() {
                continue;
            }

            if field.file_name().is_some() {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|_| ServiceError::bad_request(MSG_BAD_MULTIPART))?;
                if !data.is_empty() {
                    form.files.insert(name, Upload::new(content_type, data.to_vec()));
                }
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ServiceError::bad_request(MSG_BAD_MULTIPART))?;
                form.texts.insert(name, text);
            }
        }
        Ok(form)
    }

    pub fn text(&self, name: &str) -> &str {
        self.texts.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name)
    }

    #[cfg(test)]
    pub(crate) fn from_parts(texts: &[(&str, &str)], files: Vec<(&str, Upload)>) -> Self {
        Self {
            texts: texts
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files: files.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }
}
