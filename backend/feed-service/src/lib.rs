/// Feed Service Library
///
/// Publishing backend for Quill: accounts, posts owned by their creators,
/// paginated listing and real-time post events, served over REST and GraphQL.
///
/// # Modules
///
/// - `config`: Configuration management
/// - `db`: Store traits with Postgres and in-memory implementations
/// - `error`: Error types and handling
/// - `events`: Post event broadcasting
/// - `handlers`: REST and GraphQL HTTP handlers
/// - `models`: Users, posts and their validated inputs
/// - `routes`: Route table and shared state
/// - `schema`: GraphQL schema
/// - `services`: Business logic layer
/// - `storage`: Image storage
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod storage;

pub use config::Config;
pub use error::{AppError, Result};
pub use routes::{configure_routes, AppState};
