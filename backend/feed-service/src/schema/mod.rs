//! GraphQL schema
//!
//! Same operations as the REST surface. The HTTP layer attaches the caller's
//! `Identity` to every request; resolvers that need a user check it
//! themselves.

pub mod auth;
pub mod content;
pub mod subscription;

use async_graphql::{Context, MergedObject, Schema};
use crypto_core::Identity;
use std::sync::Arc;

use crate::events::EventBroadcaster;
use crate::services::{AccountService, PostService};

/// Root query object
#[derive(MergedObject, Default)]
pub struct QueryRoot(auth::AuthQuery, content::ContentQuery);

/// Root mutation object
#[derive(MergedObject, Default)]
pub struct MutationRoot(auth::AuthMutation, content::ContentMutation);

pub type FeedSchema = Schema<QueryRoot, MutationRoot, subscription::SubscriptionRoot>;

pub fn build_schema(
    accounts: Arc<AccountService>,
    posts: Arc<PostService>,
    events: Arc<dyn EventBroadcaster>,
) -> FeedSchema {
    Schema::build(
        QueryRoot::default(),
        MutationRoot::default(),
        subscription::SubscriptionRoot,
    )
    .data(accounts)
    .data(posts)
    .data(events)
    .finish()
}

/// Caller attached to the request, anonymous when absent.
pub(crate) fn identity(ctx: &Context<'_>) -> Identity {
    ctx.data_opt::<Identity>().cloned().unwrap_or_default()
}
