use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::user::User;

/// A published post. `creator` never changes after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub image_ref: String,
    pub creator: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for the post store.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub image_ref: String,
    pub creator: Uuid,
}

/// The only fields an update may touch.
#[derive(Debug, Clone)]
pub struct PostChanges {
    pub title: String,
    pub content: String,
    pub image_ref: String,
}

/// Post form after trimming, shared by create and update.
#[derive(Debug, Clone, Validate)]
pub struct PostInput {
    #[validate(length(min = 5, max = 200, message = "Title must be at least 5 and at most 200 characters long."))]
    pub title: String,
    #[validate(length(min = 5, max = 10000, message = "Content must be at least 5 and at most 10000 characters long."))]
    pub content: String,
    #[validate(length(min = 1, message = "No image provided."))]
    pub image_ref: String,
}

impl PostInput {
    pub fn new(title: &str, content: &str, image_ref: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            content: content.trim().to_string(),
            image_ref: image_ref.trim().to_string(),
        }
    }

    pub fn into_new_post(self, creator: Uuid) -> NewPost {
        NewPost {
            title: self.title,
            content: self.content,
            image_ref: self.image_ref,
            creator,
        }
    }

    pub fn into_changes(self) -> PostChanges {
        PostChanges {
            title: self.title,
            content: self.content,
            image_ref: self.image_ref,
        }
    }
}

/// Public fields of a post's creator. `name` is absent when the account
/// record is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorSummary {
    pub id: Uuid,
    pub name: Option<String>,
}

impl CreatorSummary {
    pub fn of(creator: Uuid, user: Option<&User>) -> Self {
        Self {
            id: creator,
            name: user.map(|user| user.name.clone()),
        }
    }
}

/// Read model: a post joined with its creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub image_ref: String,
    pub creator: CreatorSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostView {
    pub fn new(post: Post, creator: Option<&User>) -> Self {
        Self {
            creator: CreatorSummary::of(post.creator, creator),
            id: post.id,
            title: post.title,
            content: post.content,
            image_ref: post.image_ref,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

/// One page of the listing plus the total independent of the window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    pub posts: Vec<PostView>,
    pub total_items: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(creator: Uuid) -> Post {
        let now = Utc::now();
        Post {
            id: Uuid::new_v4(),
            title: "Hello".into(),
            content: "World!".into(),
            image_ref: "images/a.png".into(),
            creator,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_title_boundary() {
        let errors = PostInput::new("abcd", "valid content", "images/a.png")
            .validate()
            .unwrap_err();
        let message = errors.field_errors()["title"][0]
            .message
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_default();
        assert!(message.contains("at least 5"), "{message}");
        assert!(PostInput::new("abcde", "valid content", "images/a.png")
            .validate()
            .is_ok());
        assert!(PostInput::new("   abcd   ", "valid content", "images/a.png")
            .validate()
            .is_err());
    }

    #[test]
    fn test_missing_image_rejected() {
        let errors = PostInput::new("Title", "Content", "  ").validate().unwrap_err();
        assert!(errors.field_errors().len() == 1);
    }

    #[test]
    fn test_view_tolerates_missing_creator() {
        let creator = Uuid::new_v4();
        let view = PostView::new(post(creator), None);

        assert_eq!(view.creator.id, creator);
        assert_eq!(view.creator.name, None);
    }

    #[test]
    fn test_view_serializes_camel_case() {
        let view = PostView::new(post(Uuid::new_v4()), None);
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["imageRef"], "images/a.png");
        assert!(json.get("createdAt").is_some());
    }
}
