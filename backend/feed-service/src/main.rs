use actix_cors::Cors;
use actix_middleware::RequestLogging;
use actix_web::{App, HttpServer};
use anyhow::Context;
use feed_service::config::Config;
use feed_service::db::{self, PgPostStore, PgUserStore};
use feed_service::events::ChannelBroadcaster;
use feed_service::routes::{configure_routes, AppState};
use feed_service::storage::LocalImageStore;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,feed_service=debug,actix_web=info,sqlx=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true)
                .with_line_number(true),
        )
        .init();
}

fn cors(config: &Config) -> Cors {
    let mut cors = Cors::default();
    for origin in config.cors.origins() {
        if origin == "*" {
            cors = cors.allow_any_origin();
        } else {
            cors = cors.allowed_origin(origin);
        }
    }
    cors.allow_any_method().allow_any_header().max_age(3600)
}

async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let Some(url) = config.database.url.as_deref() else {
        tracing::warn!("DATABASE_URL not set, using in-memory stores");
        return AppState::in_memory(config).context("failed to build application state");
    };

    let pool = db::create_pool(&config.database, url)
        .await
        .context("failed to create database pool")?;
    db::migrate(&pool).await.context("failed to run migrations")?;

    AppState::new(
        config,
        Arc::new(PgUserStore::new(pool.clone())),
        Arc::new(PgPostStore::new(pool)),
        Arc::new(LocalImageStore::new(&config.media.image_dir)),
        Arc::new(ChannelBroadcaster::default()),
    )
    .context("failed to build application state")
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env()
        .map_err(anyhow::Error::msg)
        .context("failed to load configuration")?;

    tracing::info!("Starting feed-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(env = %config.app.env, per_page = config.feed.per_page, "configuration loaded");

    let state = build_state(&config).await?;

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(cors(&config))
            .wrap(RequestLogging::new().quiet("/health"))
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(|cfg| configure_routes(cfg, &state))
    })
    .bind(&bind_address)
    .with_context(|| format!("failed to bind {bind_address}"))?
    .run()
    .await
    .context("HTTP server failed")?;

    tracing::info!("feed-service stopped");
    Ok(())
}
