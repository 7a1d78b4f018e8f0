/// HTTP handlers for feed-service
///
/// - `auth`: signup, login and status
/// - `posts`: post CRUD and listing
/// - `images`: image upload and serving
/// - `graphql`: GraphQL over HTTP and WebSocket
pub mod auth;
pub mod graphql;
pub mod images;
pub mod posts;

use actix_multipart::Multipart;
use futures_util::StreamExt;
use mime::Mime;
use std::collections::HashMap;

use crate::error::{AppError, Result};
use crate::storage::ImageStoreError;

/// Longest text field accepted in a multipart form.
const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

/// A file part of a multipart form.
#[derive(Debug)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub content_type: Mime,
}

/// A parsed multipart form: text fields plus at most one `image` file.
#[derive(Debug, Default)]
pub struct PostForm {
    pub fields: HashMap<String, String>,
    pub image: Option<UploadedImage>,
}

impl PostForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Read every part of `payload`, rejecting files over `max_image_bytes`.
    pub async fn read(mut payload: Multipart, max_image_bytes: usize) -> Result<Self> {
        let mut form = PostForm::default();

        while let Some(field) = payload.next().await {
            let mut field =
                field.map_err(|e| AppError::validation("form", &format!("Multipart error: {e}")))?;

            let name = field.name().to_string();
            let is_file = field.content_disposition().get_filename().is_some();

            if is_file && name == "image" {
                let content_type = field
                    .content_type()
                    .cloned()
                    .unwrap_or(mime::APPLICATION_OCTET_STREAM);

                let mut bytes = Vec::new();
                while let Some(chunk) = field.next().await {
                    let data = chunk
                        .map_err(|e| AppError::validation("image", &format!("Upload error: {e}")))?;
                    if bytes.len() + data.len() > max_image_bytes {
                        return Err(ImageStoreError::TooLarge {
                            limit: max_image_bytes,
                        }
                        .into());
                    }
                    bytes.extend_from_slice(&data);
                }

                if !bytes.is_empty() {
                    form.image = Some(UploadedImage {
                        bytes,
                        content_type,
                    });
                }
            } else if !is_file {
                let mut value = Vec::new();
                while let Some(chunk) = field.next().await {
                    let data = chunk
                        .map_err(|e| AppError::validation(&name, &format!("Upload error: {e}")))?;
                    if value.len() + data.len() > MAX_TEXT_FIELD_BYTES {
                        return Err(AppError::validation(&name, "Field is too large."));
                    }
                    value.extend_from_slice(&data);
                }
                form.fields
                    .insert(name, String::from_utf8_lossy(&value).into_owned());
            } else {
                // Drain unexpected files
                while let Some(chunk) = field.next().await {
                    chunk.map_err(|e| AppError::validation(&name, &format!("Upload error: {e}")))?;
                }
            }
        }

        Ok(form)
    }
}
