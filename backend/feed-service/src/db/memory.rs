//! In-memory stores with the same semantics as the Postgres ones.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{PostStore, StoreError, StoreResult, UserStore};
use crate::models::{NewPost, NewUser, Post, PostChanges, User, DEFAULT_STATUS};

/// Hands out strictly increasing timestamps.
#[derive(Debug, Default)]
struct MonotonicClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl MonotonicClock {
    fn now(&self) -> DateTime<Utc> {
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut now = Utc::now();
        if let Some(prev) = *last {
            if now <= prev {
                now = prev + Duration::microseconds(1);
            }
        }
        *last = Some(now);
        now
    }
}

#[derive(Default)]
struct Users {
    by_id: HashMap<Uuid, User>,
    by_email: HashMap<String, Uuid>,
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Users>,
    clock: MonotonicClock,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.by_id.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .by_email
            .get(email)
            .and_then(|id| users.by_id.get(id))
            .cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(ids.iter().filter_map(|id| users.by_id.get(id)).cloned().collect())
    }

    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.by_email.contains_key(&user.email) {
            return Err(StoreError::Duplicate("User".to_string()));
        }

        let record = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            status: DEFAULT_STATUS.to_string(),
            posts: Vec::new(),
            created_at: self.clock.now(),
        };

        users.by_email.insert(record.email.clone(), record.id);
        users.by_id.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_status(&self, id: Uuid, status: &str) -> StoreResult<()> {
        let mut users = self.users.write().await;
        let user = users.by_id.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.status = status.to_string();
        Ok(())
    }

    async fn push_post(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<()> {
        let mut users = self.users.write().await;
        let user = users.by_id.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        if !user.posts.contains(&post_id) {
            user.posts.push(post_id);
        }
        Ok(())
    }

    async fn remove_post(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<()> {
        let mut users = self.users.write().await;
        let user = users.by_id.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.posts.retain(|id| *id != post_id);
        Ok(())
    }

    async fn replace_posts(&self, user_id: Uuid, post_ids: &[Uuid]) -> StoreResult<()> {
        let mut users = self.users.write().await;
        let user = users.by_id.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.posts = post_ids.to_vec();
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryPostStore {
    posts: RwLock<HashMap<Uuid, Post>>,
    clock: MonotonicClock,
}

impl MemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn insert(&self, post: NewPost) -> StoreResult<Post> {
        let now = self.clock.now();
        let record = Post {
            id: Uuid::new_v4(),
            title: post.title,
            content: post.content,
            image_ref: post.image_ref,
            creator: post.creator,
            created_at: now,
            updated_at: now,
        };

        self.posts.write().await.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Post>> {
        Ok(self.posts.read().await.get(&id).cloned())
    }

    async fn find_page(&self, skip: u64, limit: u64) -> StoreResult<Vec<Post>> {
        let mut posts: Vec<Post> = self.posts.read().await.values().cloned().collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(posts
            .into_iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect())
    }

    async fn update(&self, id: Uuid, changes: PostChanges) -> StoreResult<Post> {
        let mut posts = self.posts.write().await;
        let post = posts.get_mut(&id).ok_or(StoreError::NotFound)?;
        post.title = changes.title;
        post.content = changes.content;
        post.image_ref = changes.image_ref;
        post.updated_at = self.clock.now();
        Ok(post.clone())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.posts.write().await.remove(&id).is_some())
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.posts.read().await.len() as u64)
    }

    async fn ids_by_creator(&self, creator: Uuid) -> StoreResult<Vec<Uuid>> {
        let posts = self.posts.read().await;
        let mut owned: Vec<&Post> = posts.values().filter(|p| p.creator == creator).collect();
        owned.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(owned.into_iter().map(|p| p.id).collect())
    }

    async fn image_in_use(&self, image_ref: &str, except: Option<Uuid>) -> StoreResult<bool> {
        Ok(self
            .posts
            .read()
            .await
            .values()
            .any(|p| p.image_ref == image_ref && Some(p.id) != except))
    }
}
