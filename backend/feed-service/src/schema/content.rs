//! Post schema

use async_graphql::{Context, ErrorExtensions, InputObject, Object, Result as GraphQLResult, SimpleObject, ID};
use std::sync::Arc;
use uuid::Uuid;

use super::identity;
use crate::error::AppError;
use crate::models::{CreatorSummary, PostPage, PostView};
use crate::services::PostService;

#[derive(SimpleObject, Clone, Debug)]
#[graphql(name = "Creator")]
pub struct CreatorObject {
    pub id: ID,
    pub name: Option<String>,
}

impl From<CreatorSummary> for CreatorObject {
    fn from(creator: CreatorSummary) -> Self {
        CreatorObject {
            id: ID(creator.id.to_string()),
            name: creator.name,
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
#[graphql(name = "Post")]
pub struct PostObject {
    pub id: ID,
    pub title: String,
    pub content: String,
    pub image_ref: String,
    pub creator: CreatorObject,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PostView> for PostObject {
    fn from(post: PostView) -> Self {
        PostObject {
            id: ID(post.id.to_string()),
            title: post.title,
            content: post.content,
            image_ref: post.image_ref,
            creator: post.creator.into(),
            created_at: post.created_at.to_rfc3339(),
            updated_at: post.updated_at.to_rfc3339(),
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
pub struct PostData {
    pub posts: Vec<PostObject>,
    pub total_posts: u64,
}

impl From<PostPage> for PostData {
    fn from(page: PostPage) -> Self {
        PostData {
            posts: page.posts.into_iter().map(PostObject::from).collect(),
            total_posts: page.total_items,
        }
    }
}

/// `imageRef` comes from `PUT /post-image`. It may be omitted on edit to
/// keep the current image.
#[derive(InputObject, Debug)]
pub struct PostInputData {
    pub title: String,
    pub content: String,
    pub image_ref: Option<String>,
}

fn posts<'a>(ctx: &Context<'a>) -> GraphQLResult<&'a Arc<PostService>> {
    ctx.data::<Arc<PostService>>()
}

fn parse_post_id(id: &ID) -> GraphQLResult<Uuid> {
    Uuid::parse_str(id.as_str()).map_err(|_| AppError::NotFound("Could not find post.".to_string()).extend())
}

fn require_login(ctx: &Context<'_>) -> GraphQLResult<()> {
    if identity(ctx).is_authenticated() {
        Ok(())
    } else {
        Err(AppError::not_authenticated().extend())
    }
}

#[derive(Default)]
pub struct ContentQuery;

#[Object]
impl ContentQuery {
    /// Newest posts first
    async fn get_posts(&self, ctx: &Context<'_>, page: Option<i64>) -> GraphQLResult<PostData> {
        require_login(ctx)?;
        let page = posts(ctx)?.list_posts(page).await.map_err(|e| e.extend())?;
        Ok(page.into())
    }

    async fn get_post(&self, ctx: &Context<'_>, id: ID) -> GraphQLResult<PostObject> {
        require_login(ctx)?;
        let post_id = parse_post_id(&id)?;
        let post = posts(ctx)?.get_post(post_id).await.map_err(|e| e.extend())?;
        Ok(post.into())
    }
}

#[derive(Default)]
pub struct ContentMutation;

#[Object]
impl ContentMutation {
    async fn create_post(&self, ctx: &Context<'_>, post_input: PostInputData) -> GraphQLResult<PostObject> {
        let post = posts(ctx)?
            .create_post(
                &identity(ctx),
                &post_input.title,
                &post_input.content,
                post_input.image_ref.as_deref(),
            )
            .await
            .map_err(|e| e.extend())?;
        Ok(post.into())
    }

    async fn edit_post(&self, ctx: &Context<'_>, id: ID, post_input: PostInputData) -> GraphQLResult<PostObject> {
        let post_id = parse_post_id(&id)?;
        let post = posts(ctx)?
            .update_post(
                &identity(ctx),
                post_id,
                &post_input.title,
                &post_input.content,
                post_input.image_ref.as_deref(),
            )
            .await
            .map_err(|e| e.extend())?;
        Ok(post.into())
    }

    async fn delete_post(&self, ctx: &Context<'_>, id: ID) -> GraphQLResult<bool> {
        let post_id = parse_post_id(&id)?;
        posts(ctx)?
            .delete_post(&identity(ctx), post_id)
            .await
            .map_err(|e| e.extend())?;
        Ok(true)
    }
}
