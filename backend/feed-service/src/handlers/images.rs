/// Image handlers - upload for GraphQL clients and read-only serving
use actix_middleware::RequestIdentity;
use actix_multipart::Multipart;
use actix_web::{http::header, web, HttpResponse};
use serde_json::json;

use super::PostForm;
use crate::error::{AppError, Result};
use crate::routes::AppState;
use crate::storage::{ImageStoreError, IMAGE_PREFIX};

/// PUT /post-image (multipart: image, optional oldPath)
///
/// Without a file the request succeeds and nothing changes, so clients can
/// keep the current image. `oldPath` is accepted but never deleted here: the
/// previous image goes away when the owner's `editPost` switches to the new
/// reference.
pub async fn upload_image(
    state: web::Data<AppState>,
    identity: RequestIdentity,
    payload: Multipart,
) -> Result<HttpResponse> {
    let form = PostForm::read(payload, state.max_upload_bytes).await?;

    let Some(image) = &form.image else {
        return Ok(HttpResponse::Ok().json(json!({ "message": "No file provided!" })));
    };

    let file_path = state
        .posts
        .store_image(&identity.0, &image.bytes, &image.content_type)
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "File stored.",
        "filePath": file_path,
    })))
}

/// GET /images/{file}
pub async fn serve_image(
    state: web::Data<AppState>,
    file: web::Path<String>,
) -> Result<HttpResponse> {
    let reference = format!("{IMAGE_PREFIX}{}", file.into_inner());
    let not_found = || AppError::NotFound("Image not found.".to_string());

    let (bytes, content_type) = match state.images.load(&reference).await {
        Ok(Some(found)) => found,
        Ok(None) => return Err(not_found()),
        Err(ImageStoreError::InvalidReference(_)) => return Err(not_found()),
        Err(e) => return Err(e.into()),
    };

    Ok(HttpResponse::Ok()
        .content_type(content_type)
        .insert_header((header::CACHE_CONTROL, "public, max-age=86400"))
        .body(bytes))
}
