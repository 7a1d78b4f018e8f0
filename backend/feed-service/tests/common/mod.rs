//! Shared fixtures for feed-service integration tests
#![allow(dead_code)]

use feed_service::config::{
    AppConfig, AuthConfig, Config, CorsConfig, DatabaseConfig, FeedConfig, MediaConfig,
};
use std::path::Path;

pub const BOUNDARY: &str = "quill-test-boundary";
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake-image-data";

pub fn test_config(image_dir: &Path) -> Config {
    Config {
        app: AppConfig {
            env: "test".into(),
            host: "127.0.0.1".into(),
            port: 0,
        },
        cors: CorsConfig {
            allowed_origins: "*".into(),
        },
        database: DatabaseConfig {
            url: None,
            max_connections: 1,
        },
        auth: AuthConfig {
            jwt_secret: "t".repeat(48),
            token_ttl_secs: 3600,
        },
        media: MediaConfig {
            image_dir: image_dir.to_string_lossy().into_owned(),
            max_upload_bytes: 1024 * 1024,
        },
        feed: FeedConfig { per_page: 2 },
    }
}

/// An uploaded file part: (field name, file name, content type, bytes).
pub type FilePart<'a> = (&'a str, &'a str, &'a str, &'a [u8]);

/// Build a multipart/form-data body and its content type header.
pub fn multipart(fields: &[(&str, &str)], file: Option<FilePart<'_>>) -> (String, Vec<u8>) {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    if let Some((name, file_name, content_type, bytes)) = file {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

/// Multipart post form with a PNG attached.
pub fn post_form(title: &str, content: &str) -> (String, Vec<u8>) {
    multipart(
        &[("title", title), ("content", content)],
        Some(("image", "photo.png", "image/png", PNG_BYTES)),
    )
}
