/// Post service - handles post creation, retrieval, and management
///
/// Every mutation follows the same order: identity, existence, ownership,
/// validation, store write, then the secondary steps (back-reference, image
/// cleanup, broadcast). Secondary failures are logged and never undo a
/// committed write.
use crypto_core::Identity;
use mime::Mime;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::permissions::{authorize_mutation, require_user};
use crate::db::{PostStore, StoreError, UserStore};
use crate::error::{AppError, Result};
use crate::events::{EventBroadcaster, FeedEvent, POSTS_TOPIC};
use crate::models::{Post, PostInput, PostPage, PostView, User};
use crate::storage::ImageStore;

pub struct PostService {
    users: Arc<dyn UserStore>,
    posts: Arc<dyn PostStore>,
    images: Arc<dyn ImageStore>,
    events: Arc<dyn EventBroadcaster>,
    per_page: u32,
}

impl PostService {
    pub fn new(
        users: Arc<dyn UserStore>,
        posts: Arc<dyn PostStore>,
        images: Arc<dyn ImageStore>,
        events: Arc<dyn EventBroadcaster>,
        per_page: u32,
    ) -> Self {
        Self {
            users,
            posts,
            images,
            events,
            per_page: per_page.max(1),
        }
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Create a post owned by the caller.
    pub async fn create_post(
        &self,
        identity: &Identity,
        title: &str,
        content: &str,
        image_ref: Option<&str>,
    ) -> Result<PostView> {
        let user_id = require_user(identity)?;

        let input = PostInput::new(title, content, image_ref.unwrap_or_default());
        input.validate()?;
        self.ensure_image_free(&input.image_ref, None).await?;

        let creator = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthenticated("User not found.".to_string()))?;

        let post = self.posts.insert(input.into_new_post(user_id)).await?;

        if let Err(e) = self.users.push_post(user_id, post.id).await {
            tracing::warn!(post_id = %post.id, user_id = %user_id, error = %e, "failed to record post on creator");
        }

        tracing::info!(post_id = %post.id, user_id = %user_id, "post created");

        let view = PostView::new(post, Some(&creator));
        self.publish_after_commit(FeedEvent::created(view.clone())).await;
        Ok(view)
    }

    pub async fn get_post(&self, post_id: Uuid) -> Result<PostView> {
        let post = self.find_post(post_id).await?;
        let creator = self.creator_of(&post).await;
        Ok(PostView::new(post, creator.as_ref()))
    }

    /// One page of posts, newest first.
    ///
    /// A missing or non-positive page means the first one.
    pub async fn list_posts(&self, page: Option<i64>) -> Result<PostPage> {
        let page = page.filter(|p| *p > 0).unwrap_or(1) as u64;
        let per_page = u64::from(self.per_page);
        let skip = (page - 1).saturating_mul(per_page);

        let total_items = self.posts.count().await?;
        let posts = self.posts.find_page(skip, per_page).await?;

        let creator_ids: Vec<Uuid> = posts
            .iter()
            .map(|p| p.creator)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let creators: HashMap<Uuid, User> = self
            .users
            .find_by_ids(&creator_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let posts = posts
            .into_iter()
            .map(|post| {
                let creator = creators.get(&post.creator);
                PostView::new(post, creator)
            })
            .collect();

        Ok(PostPage { posts, total_items })
    }

    /// Replace title, content and optionally the image of an owned post.
    ///
    /// Without a new image reference the current one is kept.
    pub async fn update_post(
        &self,
        identity: &Identity,
        post_id: Uuid,
        title: &str,
        content: &str,
        image_ref: Option<&str>,
    ) -> Result<PostView> {
        require_user(identity)?;
        let existing = self.find_post(post_id).await?;
        authorize_mutation(&existing, identity)?;

        let image_ref = image_ref
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(existing.image_ref.as_str());
        let input = PostInput::new(title, content, image_ref);
        input.validate()?;
        if input.image_ref != existing.image_ref {
            self.ensure_image_free(&input.image_ref, Some(post_id)).await?;
        }

        let updated = self
            .posts
            .update(post_id, input.into_changes())
            .await
            .map_err(|e| match e {
                StoreError::NotFound => post_not_found(),
                other => other.into(),
            })?;

        if updated.image_ref != existing.image_ref {
            self.discard_image(&existing.image_ref).await;
        }

        tracing::info!(post_id = %post_id, "post updated");

        let creator = self.creator_of(&updated).await;
        let view = PostView::new(updated, creator.as_ref());
        self.publish_after_commit(FeedEvent::updated(view.clone())).await;
        Ok(view)
    }

    pub async fn delete_post(&self, identity: &Identity, post_id: Uuid) -> Result<()> {
        require_user(identity)?;
        let post = self.find_post(post_id).await?;
        authorize_mutation(&post, identity)?;

        if !self.posts.delete(post_id).await? {
            return Err(post_not_found());
        }

        if let Err(e) = self.users.remove_post(post.creator, post_id).await {
            tracing::warn!(post_id = %post_id, user_id = %post.creator, error = %e, "failed to drop post from creator");
        }
        self.discard_image(&post.image_ref).await;

        tracing::info!(post_id = %post_id, "post deleted");

        self.publish_after_commit(FeedEvent::deleted(post_id)).await;
        Ok(())
    }

    /// Store an uploaded image under a fresh reference.
    ///
    /// Nothing is deleted here. The image a post stops using is removed by
    /// `update_post` once ownership has been checked.
    pub async fn store_image(
        &self,
        identity: &Identity,
        bytes: &[u8],
        content_type: &Mime,
    ) -> Result<String> {
        require_user(identity)?;
        Ok(self.images.store(bytes, content_type).await?)
    }

    /// Reject a client-supplied reference that another post already uses.
    async fn ensure_image_free(&self, image_ref: &str, post_id: Option<Uuid>) -> Result<()> {
        if self.posts.image_in_use(image_ref, post_id).await? {
            return Err(AppError::validation(
                "imageRef",
                "Image is attached to another post.",
            ));
        }
        Ok(())
    }

    /// Rebuild `User.posts` from the post store. Safe to repeat.
    pub async fn reconcile_user_posts(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let ids = self.posts.ids_by_creator(user_id).await?;
        self.users.replace_posts(user_id, &ids).await?;

        tracing::info!(user_id = %user_id, posts = ids.len(), "user posts reconciled");
        Ok(ids)
    }

    /// Broadcast once the store write has returned. Never fails the request.
    async fn publish_after_commit(&self, event: FeedEvent) {
        let post_id = event.post_id;
        let action = event.action;
        match self.events.publish(POSTS_TOPIC, event).await {
            Ok(delivered) => {
                tracing::debug!(post_id = %post_id, action = ?action, delivered, "post event published")
            }
            Err(e) => {
                tracing::warn!(post_id = %post_id, action = ?action, error = %e, "post event not published")
            }
        }
    }

    /// Best-effort removal of an image no post points at anymore.
    pub async fn discard_image(&self, reference: &str) {
        if let Err(e) = self.images.delete(reference).await {
            tracing::warn!(image_ref = %reference, error = %e, "failed to delete image");
        }
    }

    async fn find_post(&self, post_id: Uuid) -> Result<Post> {
        self.posts
            .find_by_id(post_id)
            .await?
            .ok_or_else(post_not_found)
    }

    async fn creator_of(&self, post: &Post) -> Option<User> {
        match self.users.find_by_id(post.creator).await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(post_id = %post.id, error = %e, "creator lookup failed");
                None
            }
        }
    }
}

fn post_not_found() -> AppError {
    AppError::NotFound("Could not find post.".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryPostStore, MemoryUserStore};
    use crate::events::{ChannelBroadcaster, PostAction};
    use crate::models::NewUser;
    use crate::storage::LocalImageStore;
    use tempfile::TempDir;

    struct Fixture {
        service: PostService,
        users: Arc<MemoryUserStore>,
        events: Arc<ChannelBroadcaster>,
        _dir: TempDir,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let users = Arc::new(MemoryUserStore::new());
        let events = Arc::new(ChannelBroadcaster::default());
        let service = PostService::new(
            users.clone(),
            Arc::new(MemoryPostStore::new()),
            Arc::new(LocalImageStore::new(dir.path())),
            events.clone(),
            2,
        );
        Fixture {
            service,
            users,
            events,
            _dir: dir,
        }
    }

    async fn member(fx: &Fixture, email: &str) -> Identity {
        let user = fx
            .users
            .insert(NewUser {
                email: email.to_string(),
                name: email.split('@').next().unwrap_or_default().to_string(),
                password_hash: "$argon2id$stub".to_string(),
            })
            .await
            .unwrap();
        Identity::authenticated(user.id, email)
    }

    #[tokio::test]
    async fn test_create_links_creator_and_publishes() {
        let fx = fixture();
        let ada = member(&fx, "ada@example.com").await;
        let mut rx = fx.events.subscribe(POSTS_TOPIC);

        let view = fx
            .service
            .create_post(&ada, "Hello", "First post", Some("images/a.png"))
            .await
            .unwrap();

        assert_eq!(view.creator.name.as_deref(), Some("ada"));
        let user = fx.users.find_by_id(ada.user_id().unwrap()).await.unwrap().unwrap();
        assert_eq!(user.posts, vec![view.id]);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.action, PostAction::Created);
        assert_eq!(event.post_id, view.id);
    }

    #[tokio::test]
    async fn test_create_rejects_short_title_without_publishing() {
        let fx = fixture();
        let ada = member(&fx, "ada@example.com").await;
        let mut rx = fx.events.subscribe(POSTS_TOPIC);

        let err = fx
            .service
            .create_post(&ada, "abcd", "Valid content", Some("images/a.png"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
        let fields = err.fields().unwrap();
        assert_eq!(fields[0].field, "title");
        assert!(fields[0].message.contains("at least 5"), "{}", fields[0].message);
        assert!(rx.try_recv().is_err());

        fx.service
            .create_post(&ada, "abcde", "Valid content", Some("images/a.png"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_requires_existing_creator() {
        let fx = fixture();
        let ghost = Identity::authenticated(Uuid::new_v4(), "ghost@example.com");

        let err = fx
            .service
            .create_post(&ghost, "Hello", "Content", Some("images/a.png"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "AuthenticationError");
    }

    #[tokio::test]
    async fn test_pagination_windows() {
        let fx = fixture();
        let ada = member(&fx, "ada@example.com").await;
        let mut ids = Vec::new();
        for i in 1..=5 {
            let view = fx
                .service
                .create_post(
                    &ada,
                    &format!("Post {i}"),
                    "Some content",
                    Some(format!("images/{i}.png").as_str()),
                )
                .await
                .unwrap();
            ids.push(view.id);
        }

        let page = |p: Option<i64>| {
            let service = &fx.service;
            async move { service.list_posts(p).await.unwrap() }
        };

        let first = page(Some(1)).await;
        assert_eq!(first.total_items, 5);
        assert_eq!(
            first.posts.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![ids[4], ids[3]]
        );

        let third = page(Some(3)).await;
        assert_eq!(third.posts.iter().map(|p| p.id).collect::<Vec<_>>(), vec![ids[0]]);
        assert_eq!(third.total_items, 5);

        assert!(page(Some(4)).await.posts.is_empty());
        assert_eq!(page(None).await.posts[0].id, ids[4]);
        assert_eq!(page(Some(0)).await.posts[0].id, ids[4]);
        assert_eq!(page(Some(-3)).await.posts[0].id, ids[4]);
    }

    #[tokio::test]
    async fn test_non_owner_cannot_mutate() {
        let fx = fixture();
        let ada = member(&fx, "ada@example.com").await;
        let bob = member(&fx, "bob@example.com").await;
        let post = fx
            .service
            .create_post(&ada, "Hello", "First post", Some("images/a.png"))
            .await
            .unwrap();

        let err = fx
            .service
            .update_post(&bob, post.id, "Valid title", "Valid content", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "AuthorizationError");

        // ownership is checked before validation
        let err = fx
            .service
            .update_post(&bob, post.id, "x", "y", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "AuthorizationError");

        let err = fx.service.delete_post(&bob, post.id).await.unwrap_err();
        assert_eq!(err.kind(), "AuthorizationError");

        let err = fx
            .service
            .delete_post(&Identity::Anonymous, post.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "AuthenticationError");

        assert_eq!(fx.service.get_post(post.id).await.unwrap().title, "Hello");
    }

    #[tokio::test]
    async fn test_update_keeps_image_when_absent() {
        let fx = fixture();
        let ada = member(&fx, "ada@example.com").await;
        let post = fx
            .service
            .create_post(&ada, "Hello", "First post", Some("images/a.png"))
            .await
            .unwrap();

        let updated = fx
            .service
            .update_post(&ada, post.id, "Hello again", "Edited post", None)
            .await
            .unwrap();
        assert_eq!(updated.image_ref, "images/a.png");
        assert_eq!(updated.title, "Hello again");
        assert_eq!(updated.created_at, post.created_at);
        assert!(updated.updated_at > post.updated_at);
    }

    #[tokio::test]
    async fn test_update_replacing_image_removes_old_file() {
        let fx = fixture();
        let ada = member(&fx, "ada@example.com").await;
        let old = fx
            .service
            .store_image(&ada, b"old", &mime::IMAGE_PNG)
            .await
            .unwrap();
        let new = fx
            .service
            .store_image(&ada, b"new", &mime::IMAGE_PNG)
            .await
            .unwrap();

        let post = fx
            .service
            .create_post(&ada, "Hello", "First post", Some(old.as_str()))
            .await
            .unwrap();
        fx.service
            .update_post(&ada, post.id, "Hello", "First post", Some(new.as_str()))
            .await
            .unwrap();

        assert!(fx.service.images.load(&old).await.unwrap().is_none());
        assert!(fx.service.images.load(&new).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_cleans_up_and_publishes() {
        let fx = fixture();
        let ada = member(&fx, "ada@example.com").await;
        let image = fx
            .service
            .store_image(&ada, b"img", &mime::IMAGE_JPEG)
            .await
            .unwrap();
        let post = fx
            .service
            .create_post(&ada, "Hello", "First post", Some(image.as_str()))
            .await
            .unwrap();
        let mut rx = fx.events.subscribe(POSTS_TOPIC);

        fx.service.delete_post(&ada, post.id).await.unwrap();

        let user = fx.users.find_by_id(ada.user_id().unwrap()).await.unwrap().unwrap();
        assert!(user.posts.is_empty());
        assert!(fx.service.images.load(&image).await.unwrap().is_none());

        let event = rx.recv().await.unwrap();
        assert_eq!(event, FeedEvent::deleted(post.id));

        let err = fx.service.get_post(post.id).await.unwrap_err();
        assert_eq!(err.kind(), "NotFoundError");
        let err = fx.service.delete_post(&ada, post.id).await.unwrap_err();
        assert_eq!(err.kind(), "NotFoundError");
    }

    #[tokio::test]
    async fn test_delete_keeps_remaining_back_references() {
        let fx = fixture();
        let ada = member(&fx, "ada@example.com").await;
        let first = fx
            .service
            .create_post(&ada, "First post", "First content", Some("images/1.png"))
            .await
            .unwrap();
        let second = fx
            .service
            .create_post(&ada, "Second post", "Second content", Some("images/2.png"))
            .await
            .unwrap();

        let user = fx.users.find_by_id(ada.user_id().unwrap()).await.unwrap().unwrap();
        assert_eq!(user.posts, vec![first.id, second.id]);

        fx.service.delete_post(&ada, first.id).await.unwrap();

        let user = fx.users.find_by_id(ada.user_id().unwrap()).await.unwrap().unwrap();
        assert_eq!(user.posts, vec![second.id]);
        assert_eq!(fx.service.get_post(second.id).await.unwrap().title, "Second post");
    }

    #[tokio::test]
    async fn test_cannot_claim_another_posts_image() {
        let fx = fixture();
        let ada = member(&fx, "ada@example.com").await;
        let eve = member(&fx, "eve@example.com").await;
        let image = fx
            .service
            .store_image(&ada, b"ada", &mime::IMAGE_PNG)
            .await
            .unwrap();
        let own = fx
            .service
            .create_post(&ada, "Ada's post", "Ada's content", Some(image.as_str()))
            .await
            .unwrap();

        let err = fx
            .service
            .create_post(&eve, "Eve's post", "Eve's content", Some(image.as_str()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
        assert_eq!(err.fields().unwrap()[0].field, "imageRef");

        let eve_image = fx
            .service
            .store_image(&eve, b"eve", &mime::IMAGE_PNG)
            .await
            .unwrap();
        let eves = fx
            .service
            .create_post(&eve, "Eve's post", "Eve's content", Some(eve_image.as_str()))
            .await
            .unwrap();
        let err = fx
            .service
            .update_post(&eve, eves.id, "Eve's post", "Eve's content", Some(image.as_str()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ValidationError");

        // Deleting her own post never reaches Ada's file
        fx.service.delete_post(&eve, eves.id).await.unwrap();
        assert!(fx.service.images.load(&image).await.unwrap().is_some());

        // Resubmitting the current reference is fine
        let kept = fx
            .service
            .update_post(&ada, own.id, "Ada's post", "Edited", Some(image.as_str()))
            .await
            .unwrap();
        assert_eq!(kept.image_ref, image);
        assert!(fx.service.images.load(&image).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reconcile_rebuilds_back_reference() {
        let fx = fixture();
        let ada = member(&fx, "ada@example.com").await;
        let user_id = ada.user_id().unwrap();
        let post = fx
            .service
            .create_post(&ada, "Hello", "First post", Some("images/a.png"))
            .await
            .unwrap();

        fx.users.replace_posts(user_id, &[Uuid::new_v4()]).await.unwrap();

        let ids = fx.service.reconcile_user_posts(user_id).await.unwrap();
        assert_eq!(ids, vec![post.id]);
        let again = fx.service.reconcile_user_posts(user_id).await.unwrap();
        assert_eq!(again, ids);
        assert_eq!(fx.users.find_by_id(user_id).await.unwrap().unwrap().posts, ids);
    }
}
