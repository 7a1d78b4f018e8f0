//! Route table and shared application state

use actix_middleware::AuthGate;
use actix_web::{guard, web, HttpResponse};
use chrono::Duration;
use crypto_core::{TokenError, TokenService};
use std::sync::Arc;

use crate::config::Config;
use crate::db::{MemoryPostStore, MemoryUserStore, PostStore, UserStore};
use crate::error::AppError;
use crate::events::{ChannelBroadcaster, EventBroadcaster};
use crate::handlers::{auth, graphql, images, posts};
use crate::schema::{build_schema, FeedSchema};
use crate::services::{AccountService, PostService};
use crate::storage::{ImageStore, LocalImageStore};

/// Everything a request handler needs, cloned into each worker.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub posts: Arc<PostService>,
    pub images: Arc<dyn ImageStore>,
    pub events: Arc<dyn EventBroadcaster>,
    pub tokens: Arc<TokenService>,
    pub schema: FeedSchema,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        config: &Config,
        users: Arc<dyn UserStore>,
        post_store: Arc<dyn PostStore>,
        images: Arc<dyn ImageStore>,
        events: Arc<dyn EventBroadcaster>,
    ) -> Result<Self, TokenError> {
        let tokens = Arc::new(TokenService::new(
            &config.auth.jwt_secret,
            Duration::seconds(config.auth.token_ttl_secs),
        )?);

        let accounts = Arc::new(AccountService::new(
            users.clone(),
            post_store.clone(),
            tokens.clone(),
        ));
        let posts = Arc::new(PostService::new(
            users,
            post_store,
            images.clone(),
            events.clone(),
            config.feed.per_page,
        ));
        let schema = build_schema(accounts.clone(), posts.clone(), events.clone());

        Ok(Self {
            accounts,
            posts,
            images,
            events,
            tokens,
            schema,
            max_upload_bytes: config.media.max_upload_bytes,
        })
    }

    /// State backed by the in-memory stores and a local image directory.
    pub fn in_memory(config: &Config) -> Result<Self, TokenError> {
        Self::new(
            config,
            Arc::new(MemoryUserStore::new()),
            Arc::new(MemoryPostStore::new()),
            Arc::new(LocalImageStore::new(&config.media.image_dir)),
            Arc::new(ChannelBroadcaster::default()),
        )
    }
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| AppError::validation("body", &err.to_string()).into())
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| AppError::validation("page", &err.to_string()).into())
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|_err, _req| AppError::NotFound("Could not find post.".to_string()).into())
}

/// Register every REST and GraphQL route.
///
/// Reads run behind a soft gate, writes and status behind a hard one.
/// GraphQL resolvers check the identity themselves.
pub fn configure_routes(cfg: &mut web::ServiceConfig, state: &AppState) {
    let tokens = state.tokens.clone();

    cfg.app_data(web::Data::new(state.clone()))
        .app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .route("/health", web::get().to(health))
        .route("/signup", web::put().to(auth::signup))
        .route("/login", web::post().to(auth::login))
        .service(
            web::resource("/posts")
                .wrap(AuthGate::soft(tokens.clone()))
                .route(web::get().to(posts::list_posts)),
        )
        .service(
            web::resource("/post")
                .wrap(AuthGate::hard(tokens.clone()))
                .route(web::post().to(posts::create_post)),
        )
        .service(
            web::resource("/post/{id}")
                .guard(guard::Get())
                .wrap(AuthGate::soft(tokens.clone()))
                .route(web::get().to(posts::get_post)),
        )
        .service(
            web::resource("/post/{id}")
                .wrap(AuthGate::hard(tokens.clone()))
                .route(web::put().to(posts::update_post))
                .route(web::delete().to(posts::delete_post)),
        )
        .service(
            web::resource("/status")
                .wrap(AuthGate::hard(tokens.clone()))
                .route(web::get().to(auth::get_status))
                .route(web::put().to(auth::update_status)),
        )
        .service(
            web::resource("/post-image")
                .wrap(AuthGate::hard(tokens.clone()))
                .route(web::put().to(images::upload_image)),
        )
        .route("/images/{file}", web::get().to(images::serve_image))
        .service(
            web::resource("/graphql")
                .wrap(AuthGate::soft(tokens))
                .route(web::post().to(graphql::graphql_handler))
                .route(web::get().to(graphql::graphql_subscription_handler)),
        )
        .route("/graphql/schema", web::get().to(graphql::schema_handler));
}
