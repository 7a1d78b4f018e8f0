/// Account service - signup, login, status and profile
use crypto_core::{hash_password, verify_password, Identity, TokenService};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::permissions::require_user;
use crate::db::{PostStore, UserStore};
use crate::error::{AppError, Result};
use crate::models::{NewUser, SignupInput, StatusInput, User, UserProfile};

const BAD_CREDENTIALS: &str = "Invalid email or password.";

/// Token handed out by a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub token: String,
    pub user_id: Uuid,
}

pub struct AccountService {
    users: Arc<dyn UserStore>,
    posts: Arc<dyn PostStore>,
    tokens: Arc<TokenService>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserStore>,
        posts: Arc<dyn PostStore>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            users,
            posts,
            tokens,
        }
    }

    /// Register an account.
    pub async fn signup(&self, email: &str, name: &str, password: &str) -> Result<UserProfile> {
        let input = SignupInput::new(email, name, password);
        input.validate()?;

        if self.users.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::Conflict("User exists already.".to_string()));
        }

        let SignupInput {
            email,
            name,
            password,
        } = input;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))??;

        let user = self
            .users
            .insert(NewUser {
                email,
                name,
                password_hash,
            })
            .await?;

        tracing::info!(user_id = %user.id, "user signed up");
        Ok(UserProfile::new(user, Vec::new()))
    }

    /// Exchange credentials for a session token.
    ///
    /// An unknown email and a wrong password fail identically.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload> {
        let email = crate::models::user::normalize_email(email);
        let Some(user) = self.users.find_by_email(&email).await? else {
            tracing::debug!("login for unknown email");
            return Err(AppError::Unauthenticated(BAD_CREDENTIALS.to_string()));
        };

        let password = password.trim().to_string();
        let stored = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .map_err(|e| AppError::Internal(format!("verification task failed: {e}")))??;

        if !matches {
            tracing::debug!(user_id = %user.id, "login with wrong password");
            return Err(AppError::Unauthenticated(BAD_CREDENTIALS.to_string()));
        }

        let token = self.tokens.issue(user.id, &user.email)?;
        tracing::info!(user_id = %user.id, "user logged in");

        Ok(AuthPayload {
            token,
            user_id: user.id,
        })
    }

    pub async fn get_status(&self, identity: &Identity) -> Result<String> {
        Ok(self.current_user(identity).await?.status)
    }

    pub async fn update_status(&self, identity: &Identity, status: &str) -> Result<String> {
        let user_id = require_user(identity)?;
        let input = StatusInput::new(status);
        input.validate()?;

        self.users
            .update_status(user_id, &input.status)
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::NotFound(_) => user_not_found(),
                other => other,
            })?;

        Ok(input.status)
    }

    /// The caller's profile. Post ids come from the post store.
    pub async fn get_user(&self, identity: &Identity) -> Result<UserProfile> {
        let user = self.current_user(identity).await?;
        let posts = self.posts.ids_by_creator(user.id).await?;
        Ok(UserProfile::new(user, posts))
    }

    async fn current_user(&self, identity: &Identity) -> Result<User> {
        let user_id = require_user(identity)?;
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(user_not_found)
    }
}

fn user_not_found() -> AppError {
    AppError::NotFound("User not found.".to_string())
}
