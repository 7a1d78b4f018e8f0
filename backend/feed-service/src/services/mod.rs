/// Business logic layer for feed-service
///
/// - `accounts`: signup, login, status and profile
/// - `posts`: post lifecycle, listing and image uploads
/// - `permissions`: ownership decisions shared by update and delete
pub mod accounts;
pub mod permissions;
pub mod posts;

pub use accounts::{AccountService, AuthPayload};
pub use permissions::{authorize_mutation, can_mutate};
pub use posts::PostService;
