/// Postgres credential store
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{map_unique_violation, StoreError, StoreResult, UserStore};
use crate::models::{NewUser, User, DEFAULT_STATUS};

const USER_COLUMNS: &str = "id, email, name, password_hash, status, post_ids, created_at";

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn expect_row(rows_affected: u64) -> StoreResult<()> {
    if rows_affected == 0 {
        Err(StoreError::NotFound)
    } else {
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, name, password_hash, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(DEFAULT_STATUS)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "User"))
    }

    async fn update_status(&self, id: Uuid, status: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;

        expect_row(result.rows_affected())
    }

    async fn push_post(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET post_ids = array_append(post_ids, $2)
            WHERE id = $1 AND NOT ($2 = ANY(post_ids))
            "#,
        )
        .bind(user_id)
        .bind(post_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Either the id is already listed or the user is gone
            return match self.find_by_id(user_id).await? {
                Some(_) => Ok(()),
                None => Err(StoreError::NotFound),
            };
        }

        Ok(())
    }

    async fn remove_post(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET post_ids = array_remove(post_ids, $2) WHERE id = $1")
            .bind(user_id)
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        expect_row(result.rows_affected())
    }

    async fn replace_posts(&self, user_id: Uuid, post_ids: &[Uuid]) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET post_ids = $2 WHERE id = $1")
            .bind(user_id)
            .bind(post_ids)
            .execute(&self.pool)
            .await?;

        expect_row(result.rows_affected())
    }
}
