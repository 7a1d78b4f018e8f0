/// Ownership checks for post mutations
///
/// Only the creator of a post may update or delete it. There are no other
/// roles.
use crypto_core::Identity;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::Post;

/// Whether `identity` may update or delete `post`.
pub fn can_mutate(post: &Post, identity: &Identity) -> bool {
    identity.user_id() == Some(post.creator)
}

/// Turn the ownership decision into an error.
///
/// Anonymous callers get `AuthenticationError`, authenticated non-owners get
/// `AuthorizationError`.
pub fn authorize_mutation(post: &Post, identity: &Identity) -> Result<()> {
    if !identity.is_authenticated() {
        return Err(AppError::not_authenticated());
    }
    if can_mutate(post, identity) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not authorised.".to_string()))
    }
}

/// The caller's user id, or `AuthenticationError`.
pub fn require_user(identity: &Identity) -> Result<Uuid> {
    identity.user_id().ok_or_else(AppError::not_authenticated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn post_by(creator: Uuid) -> Post {
        Post {
            id: Uuid::new_v4(),
            title: "Title".into(),
            content: "Content".into(),
            image_ref: "images/a.png".into(),
            creator,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_owner_may_mutate() {
        let owner = Uuid::new_v4();
        let identity = Identity::authenticated(owner, "owner@example.com");

        assert!(can_mutate(&post_by(owner), &identity));
        assert!(authorize_mutation(&post_by(owner), &identity).is_ok());
    }

    #[test]
    fn test_non_owner_forbidden() {
        let post = post_by(Uuid::new_v4());
        let identity = Identity::authenticated(Uuid::new_v4(), "other@example.com");

        assert!(!can_mutate(&post, &identity));
        let err = authorize_mutation(&post, &identity).unwrap_err();
        assert_eq!(err.kind(), "AuthorizationError");
    }

    #[test]
    fn test_anonymous_unauthenticated() {
        let post = post_by(Uuid::new_v4());

        assert!(!can_mutate(&post, &Identity::Anonymous));
        let err = authorize_mutation(&post, &Identity::Anonymous).unwrap_err();
        assert_eq!(err.kind(), "AuthenticationError");
        assert!(require_user(&Identity::Anonymous).is_err());
    }
}
