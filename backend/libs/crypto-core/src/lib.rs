//! Credential primitives shared by the Quill services.
//!
//! - `jwt`: signing and verification of stateless session tokens
//! - `password`: Argon2id password hashing
//! - `identity`: the resolved caller attached to every request

pub mod identity;
pub mod jwt;
pub mod password;

pub use identity::Identity;
pub use jwt::{Claims, TokenError, TokenService};
pub use password::{hash_password, verify_password, PasswordError};
