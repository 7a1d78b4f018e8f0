/// Post handlers - HTTP endpoints for post operations
use actix_middleware::RequestIdentity;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::PostForm;
use crate::error::Result;
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

/// GET /posts?page=N
pub async fn list_posts(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let page = state.posts.list_posts(query.page).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Fetched posts successfully.",
        "posts": page.posts,
        "totalItems": page.total_items,
    })))
}

/// GET /post/{id}
pub async fn get_post(
    state: web::Data<AppState>,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let post = state.posts.get_post(*post_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Post fetched.",
        "post": post,
    })))
}

/// POST /post (multipart: title, content, image)
pub async fn create_post(
    state: web::Data<AppState>,
    identity: RequestIdentity,
    payload: Multipart,
) -> Result<HttpResponse> {
    let identity = identity.into_inner();
    let form = PostForm::read(payload, state.max_upload_bytes).await?;

    let image_ref = match &form.image {
        Some(image) => Some(
            state
                .posts
                .store_image(&identity, &image.bytes, &image.content_type)
                .await?,
        ),
        None => None,
    };

    let result = state
        .posts
        .create_post(
            &identity,
            form.text("title").unwrap_or_default(),
            form.text("content").unwrap_or_default(),
            image_ref.as_deref(),
        )
        .await;

    let post = match result {
        Ok(post) => post,
        Err(e) => {
            if let Some(reference) = &image_ref {
                state.posts.discard_image(reference).await;
            }
            return Err(e);
        }
    };

    Ok(HttpResponse::Created().json(json!({
        "message": "Post created successfully!",
        "creator": post.creator,
        "post": post,
    })))
}

/// PUT /post/{id} (multipart: title, content, and an image file or `imageRef`)
pub async fn update_post(
    state: web::Data<AppState>,
    identity: RequestIdentity,
    post_id: web::Path<Uuid>,
    payload: Multipart,
) -> Result<HttpResponse> {
    let identity = identity.into_inner();
    let form = PostForm::read(payload, state.max_upload_bytes).await?;

    let uploaded = match &form.image {
        Some(image) => Some(
            state
                .posts
                .store_image(&identity, &image.bytes, &image.content_type)
                .await?,
        ),
        None => None,
    };
    let image_ref = uploaded
        .as_deref()
        .or_else(|| form.text("imageRef"))
        .or_else(|| form.text("image"));

    let result = state
        .posts
        .update_post(
            &identity,
            *post_id,
            form.text("title").unwrap_or_default(),
            form.text("content").unwrap_or_default(),
            image_ref,
        )
        .await;

    match result {
        Ok(post) => Ok(HttpResponse::Ok().json(json!({
            "message": "Post updated!",
            "post": post,
        }))),
        Err(e) => {
            if let Some(reference) = &uploaded {
                state.posts.discard_image(reference).await;
            }
            Err(e)
        }
    }
}

/// DELETE /post/{id}
pub async fn delete_post(
    state: web::Data<AppState>,
    identity: RequestIdentity,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state.posts.delete_post(&identity.0, *post_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Deleted post." })))
}
