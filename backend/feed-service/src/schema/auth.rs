//! Account schema: signup, login, status and profile

use async_graphql::{Context, ErrorExtensions, InputObject, Object, Result as GraphQLResult, SimpleObject, ID};
use std::sync::Arc;

use super::identity;
use crate::models::UserProfile;
use crate::services::{AccountService, AuthPayload};

#[derive(InputObject, Debug)]
pub struct UserInputData {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct AuthData {
    pub token: String,
    pub user_id: ID,
}

impl From<AuthPayload> for AuthData {
    fn from(payload: AuthPayload) -> Self {
        AuthData {
            token: payload.token,
            user_id: ID(payload.user_id.to_string()),
        }
    }
}

/// An account as seen by its owner
#[derive(SimpleObject, Clone, Debug)]
#[graphql(name = "User")]
pub struct UserObject {
    pub id: ID,
    pub email: String,
    pub name: String,
    pub status: String,
    pub posts: Vec<ID>,
}

impl From<UserProfile> for UserObject {
    fn from(profile: UserProfile) -> Self {
        UserObject {
            id: ID(profile.id.to_string()),
            email: profile.email,
            name: profile.name,
            status: profile.status,
            posts: profile.posts.into_iter().map(|id| ID(id.to_string())).collect(),
        }
    }
}

fn accounts<'a>(ctx: &Context<'a>) -> GraphQLResult<&'a Arc<AccountService>> {
    ctx.data::<Arc<AccountService>>()
}

#[derive(Default)]
pub struct AuthQuery;

#[Object]
impl AuthQuery {
    async fn login(&self, ctx: &Context<'_>, email: String, password: String) -> GraphQLResult<AuthData> {
        let payload = accounts(ctx)?
            .login(&email, &password)
            .await
            .map_err(|e| e.extend())?;
        Ok(payload.into())
    }

    /// The caller's own account
    async fn get_user(&self, ctx: &Context<'_>) -> GraphQLResult<UserObject> {
        let profile = accounts(ctx)?
            .get_user(&identity(ctx))
            .await
            .map_err(|e| e.extend())?;
        Ok(profile.into())
    }

    async fn get_status(&self, ctx: &Context<'_>) -> GraphQLResult<String> {
        accounts(ctx)?
            .get_status(&identity(ctx))
            .await
            .map_err(|e| e.extend())
    }
}

#[derive(Default)]
pub struct AuthMutation;

#[Object]
impl AuthMutation {
    async fn create_user(&self, ctx: &Context<'_>, user_input: UserInputData) -> GraphQLResult<UserObject> {
        let profile = accounts(ctx)?
            .signup(&user_input.email, &user_input.name, &user_input.password)
            .await
            .map_err(|e| e.extend())?;
        Ok(profile.into())
    }

    /// Returns the stored status
    async fn edit_status(&self, ctx: &Context<'_>, status: String) -> GraphQLResult<String> {
        accounts(ctx)?
            .update_status(&identity(ctx), &status)
            .await
            .map_err(|e| e.extend())
    }
}
