/// Error types for Feed Service
///
/// Every operation returns [`Result`]. The same error renders as a JSON body
/// on the REST surface (`ResponseError`) and as an error with extensions on
/// the GraphQL surface (`ErrorExtensions`).
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use async_graphql::ErrorExtensions;
use crypto_core::{PasswordError, TokenError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::StoreError;
use crate::storage::ImageStoreError;

/// Result type for feed-service operations
pub type Result<T> = std::result::Result<T, AppError>;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation {
        message: String,
        fields: Vec<FieldError>,
    },

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        AppError::Validation {
            message: "Validation failed.".to_string(),
            fields: vec![FieldError::new(field, message)],
        }
    }

    pub fn not_authenticated() -> Self {
        AppError::Unauthenticated("Not authenticated.".to_string())
    }

    /// Stable tag shared by both transport surfaces.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "ValidationError",
            AppError::Unauthenticated(_) => "AuthenticationError",
            AppError::Forbidden(_) => "AuthorizationError",
            AppError::NotFound(_) => "NotFoundError",
            AppError::Conflict(_) => "ConflictError",
            AppError::Database(_) | AppError::Internal(_) => "InternalError",
        }
    }

    /// Message safe to hand to clients. Internal details stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Internal(_) => INTERNAL_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    pub fn fields(&self) -> Option<&[FieldError]> {
        match self {
            AppError::Validation { fields, .. } if !fields.is_empty() => Some(fields),
            _ => None,
        }
    }

    fn log_if_internal(&self) {
        if matches!(self, AppError::Database(_) | AppError::Internal(_)) {
            tracing::error!(kind = self.kind(), error = %self, "request failed");
        }
    }
}

/// JSON body of a failed REST request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<FieldError>>,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        self.log_if_internal();

        HttpResponse::build(self.status_code()).json(ErrorBody {
            message: self.client_message(),
            kind: self.kind().to_string(),
            data: self.fields().map(<[FieldError]>::to_vec),
        })
    }
}

impl ErrorExtensions for AppError {
    fn extend(&self) -> async_graphql::Error {
        self.log_if_internal();

        async_graphql::Error::new(self.client_message()).extend_with(|_, ext| {
            ext.set("code", self.status_code().as_u16());
            ext.set("kind", self.kind());
            if let Some(fields) = self.fields() {
                if let Ok(data) = async_graphql::to_value(fields) {
                    ext.set("data", data);
                }
            }
        })
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => AppError::Conflict(format!("{what} exists already.")),
            StoreError::NotFound => AppError::NotFound("Record not found.".to_string()),
            StoreError::Database(e) => AppError::Database(e.to_string()),
            StoreError::Migration(e) => AppError::Database(e.to_string()),
            StoreError::Unavailable(msg) => AppError::Database(msg),
        }
    }
}

impl From<ImageStoreError> for AppError {
    fn from(err: ImageStoreError) -> Self {
        match err {
            ImageStoreError::UnsupportedType(_) | ImageStoreError::TooLarge { .. } => {
                AppError::validation("image", &err.to_string())
            }
            ImageStoreError::InvalidReference(_) => AppError::validation("imageRef", &err.to_string()),
            ImageStoreError::Io(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(_) | TokenError::WeakSecret(_) => AppError::Internal(err.to_string()),
            _ => AppError::not_authenticated(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |err| {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid."));
                    FieldError::new(to_camel_case(&field.to_string()), message)
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));

        AppError::Validation {
            message: "Validation failed.".to_string(),
            fields,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

fn to_camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for ch in field.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PostInput;
    use validator::Validate;

    #[test]
    fn test_status_codes_and_kinds() {
        let cases = [
            (AppError::validation("title", "short"), 422, "ValidationError"),
            (AppError::not_authenticated(), 401, "AuthenticationError"),
            (AppError::Forbidden("no".into()), 403, "AuthorizationError"),
            (AppError::NotFound("gone".into()), 404, "NotFoundError"),
            (AppError::Conflict("dup".into()), 409, "ConflictError"),
            (AppError::Database("boom".into()), 500, "InternalError"),
        ];

        for (err, status, kind) in cases {
            assert_eq!(err.status_code().as_u16(), status);
            assert_eq!(err.kind(), kind);
        }
    }

    #[test]
    fn test_internal_details_hidden_from_clients() {
        let err = AppError::Database("relation \"posts\" does not exist".into());
        assert_eq!(err.client_message(), INTERNAL_MESSAGE);
    }

    #[test]
    fn test_validation_errors_keep_fields() {
        let errors = PostInput::new("abc", "abc", "images/x.png")
            .validate()
            .unwrap_err();
        let err = AppError::from(errors);

        let fields = err.fields().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].field, "content");
        assert_eq!(fields[1].field, "title");
        assert_eq!(
            fields[1].message,
            "Title must be at least 5 and at most 200 characters long."
        );
        assert!(fields[0].message.contains("at least 5"));
    }

    #[test]
    fn test_camel_case_field_names() {
        assert_eq!(to_camel_case("image_ref"), "imageRef");
        assert_eq!(to_camel_case("title"), "title");
    }

    #[test]
    fn test_duplicate_maps_to_conflict() {
        let err = AppError::from(StoreError::Duplicate("User".into()));
        assert_eq!(err.kind(), "ConflictError");
        assert_eq!(err.to_string(), "User exists already.");
    }

    #[test]
    fn test_graphql_extensions() {
        let err = AppError::Forbidden("Not authorised.".into()).extend();
        let ext = err.extensions.unwrap();

        assert_eq!(ext.get("code"), Some(&async_graphql::Value::from(403)));
        assert_eq!(ext.get("kind"), Some(&async_graphql::Value::from("AuthorizationError")));
    }
}
