/// Account handlers - signup, login and status
use actix_middleware::RequestIdentity;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::error::Result;
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    pub status: String,
}

/// PUT /signup
pub async fn signup(
    state: web::Data<AppState>,
    req: web::Json<SignupRequest>,
) -> Result<HttpResponse> {
    let profile = state
        .accounts
        .signup(&req.email, &req.name, &req.password)
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "User created!",
        "userId": profile.id,
    })))
}

/// POST /login
pub async fn login(
    state: web::Data<AppState>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    let payload = state.accounts.login(&req.email, &req.password).await?;
    Ok(HttpResponse::Ok().json(payload))
}

/// GET /status
pub async fn get_status(
    state: web::Data<AppState>,
    identity: RequestIdentity,
) -> Result<HttpResponse> {
    let status = state.accounts.get_status(&identity.0).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Fetched status.",
        "status": status,
    })))
}

/// PUT /status
pub async fn update_status(
    state: web::Data<AppState>,
    identity: RequestIdentity,
    req: web::Json<StatusRequest>,
) -> Result<HttpResponse> {
    state.accounts.update_status(&identity.0, &req.status).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Status updated." })))
}
