//! # Actix Middleware Library
//!
//! Shared middleware components for Quill Actix services
//!
//! ## Modules
//! - `jwt_auth`: session-token gate with soft and hard modes
//! - `logging`: one log line per request, leveled by response status

pub mod jwt_auth;
pub mod logging;

pub use jwt_auth::{resolve_identity, AuthGate, AuthMode, AuthRejection, RequestIdentity};
pub use logging::{Outcome, RequestLogging};
