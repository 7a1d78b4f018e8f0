use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Status every account starts with.
pub const DEFAULT_STATUS: &str = "I am new!";

/// A registered account.
///
/// `posts` mirrors `Post.creator` and is only a cache; the post store is
/// authoritative.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub status: String,
    #[sqlx(rename = "post_ids")]
    pub posts: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the credential store. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

/// Signup form after normalization.
#[derive(Debug, Clone, Validate)]
pub struct SignupInput {
    #[validate(email(message = "E-Mail is invalid."))]
    pub email: String,
    #[validate(length(min = 1, message = "Name must not be empty."))]
    pub name: String,
    #[validate(length(min = 5, message = "Password too short!"))]
    pub password: String,
}

impl SignupInput {
    /// Trim every field and lower-case the email.
    pub fn new(email: &str, name: &str, password: &str) -> Self {
        Self {
            email: normalize_email(email),
            name: name.trim().to_string(),
            password: password.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Validate)]
pub struct StatusInput {
    #[validate(length(min = 2, message = "Status must be at least 2 characters."))]
    pub status: String,
}

impl StatusInput {
    pub fn new(status: &str) -> Self {
        Self {
            status: status.trim().to_string(),
        }
    }
}

/// The caller's own account, as returned by `getUser`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub status: String,
    pub posts: Vec<Uuid>,
}

impl UserProfile {
    /// Build a profile whose post ids come from the post store rather than
    /// the cached back-reference.
    pub fn new(user: User, posts: Vec<Uuid>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            status: user.status,
            posts,
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
