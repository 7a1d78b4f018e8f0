//! Image storage
//!
//! Posts hold an opaque image reference. [`ImageStore`] turns uploaded bytes
//! into such a reference and deletes by reference; [`LocalImageStore`] keeps
//! the files under `<image_dir>/images/`.

use async_trait::async_trait;
use mime::Mime;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Directory prefix shared by every reference this store hands out.
pub const IMAGE_PREFIX: &str = "images/";

#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    #[error("image exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("invalid image reference: {0}")]
    InvalidReference(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist `bytes` and return a stable reference.
    async fn store(&self, bytes: &[u8], content_type: &Mime) -> Result<String, ImageStoreError>;

    /// Remove the image behind `reference`. Removing a missing image succeeds.
    async fn delete(&self, reference: &str) -> Result<(), ImageStoreError>;

    /// Read the image behind `reference`.
    async fn load(&self, reference: &str) -> Result<Option<(Vec<u8>, Mime)>, ImageStoreError>;
}

/// File extension for an accepted upload type.
pub fn extension_for(content_type: &Mime) -> Option<&'static str> {
    if content_type.type_() != mime::IMAGE {
        return None;
    }
    match content_type.subtype().as_str() {
        "png" => Some("png"),
        "jpeg" => Some("jpeg"),
        "jpg" => Some("jpg"),
        _ => None,
    }
}

fn mime_for(file_name: &str) -> Mime {
    if file_name.ends_with(".png") {
        mime::IMAGE_PNG
    } else {
        mime::IMAGE_JPEG
    }
}

pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a reference to a path inside the image directory.
    ///
    /// Only `images/<file>` with a plain file name is accepted, so a
    /// reference can never point outside the directory.
    pub fn resolve(&self, reference: &str) -> Result<PathBuf, ImageStoreError> {
        let reference = reference.trim().trim_start_matches('/');
        let file_name = reference
            .strip_prefix(IMAGE_PREFIX)
            .ok_or_else(|| ImageStoreError::InvalidReference(reference.to_string()))?;

        let plain = !file_name.is_empty()
            && !file_name.starts_with('.')
            && file_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !plain {
            return Err(ImageStoreError::InvalidReference(reference.to_string()));
        }

        Ok(self.root.join("images").join(file_name))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn store(&self, bytes: &[u8], content_type: &Mime) -> Result<String, ImageStoreError> {
        let ext = extension_for(content_type)
            .ok_or_else(|| ImageStoreError::UnsupportedType(content_type.to_string()))?;

        let reference = format!("{IMAGE_PREFIX}{}.{ext}", Uuid::new_v4());
        let path = self.resolve(&reference)?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(reference = %reference, size = bytes.len(), "image stored");
        Ok(reference)
    }

    async fn delete(&self, reference: &str) -> Result<(), ImageStoreError> {
        let path = self.resolve(reference)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn load(&self, reference: &str) -> Result<Option<(Vec<u8>, Mime)>, ImageStoreError> {
        let path = self.resolve(reference)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some((bytes, mime_for(reference)))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
