//! Persistence layer
//!
//! The service talks to storage only through [`UserStore`] and [`PostStore`].
//! Two implementations ship with the crate: Postgres (`PgUserStore`,
//! `PgPostStore`) and an in-memory store used by tests and by deployments
//! without `DATABASE_URL`.

pub mod memory;
pub mod post_repo;
pub mod user_repo;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::models::{NewPost, NewUser, Post, PostChanges, User};

pub use memory::{MemoryPostStore, MemoryUserStore};
pub use post_repo::PgPostStore;
pub use user_repo::PgUserStore;

/// Embedded schema migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write; carries the entity name.
    #[error("{0} already exists")]
    Duplicate(String),

    #[error("record not found")]
    NotFound,

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Credential store.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// `email` must already be normalized.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Users for the given ids; unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;

    /// Fails with `StoreError::Duplicate` when the email is taken.
    async fn insert(&self, user: NewUser) -> StoreResult<User>;

    async fn update_status(&self, id: Uuid, status: &str) -> StoreResult<()>;

    async fn push_post(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<()>;

    async fn remove_post(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<()>;

    async fn replace_posts(&self, user_id: Uuid, post_ids: &[Uuid]) -> StoreResult<()>;
}

/// Post store.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn insert(&self, post: NewPost) -> StoreResult<Post>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Post>>;

    /// Posts ordered by `created_at` descending, ties broken by id.
    async fn find_page(&self, skip: u64, limit: u64) -> StoreResult<Vec<Post>>;

    /// Fails with `StoreError::NotFound` when the post is gone.
    async fn update(&self, id: Uuid, changes: PostChanges) -> StoreResult<Post>;

    /// Returns whether a post was removed.
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;

    async fn count(&self) -> StoreResult<u64>;

    /// Ids of every post owned by `creator`, oldest first.
    async fn ids_by_creator(&self, creator: Uuid) -> StoreResult<Vec<Uuid>>;

    /// Whether a post other than `except` points at `image_ref`.
    async fn image_in_use(&self, image_ref: &str, except: Option<Uuid>) -> StoreResult<bool>;
}

/// Create the Postgres pool and verify it answers.
pub async fn create_pool(config: &DatabaseConfig, url: &str) -> StoreResult<PgPool> {
    tracing::debug!(max = config.max_connections, "creating database pool");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .test_before_acquire(true)
        .connect(url)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;
    tracing::info!("database pool created and verified");

    Ok(pool)
}

/// Apply pending migrations.
pub async fn migrate(pool: &PgPool) -> StoreResult<()> {
    MIGRATOR.run(pool).await?;
    tracing::info!("database migrations applied");
    Ok(())
}

pub(crate) fn map_unique_violation(err: sqlx::Error, entity: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Duplicate(entity.to_string())
        }
        _ => StoreError::Database(err),
    }
}
