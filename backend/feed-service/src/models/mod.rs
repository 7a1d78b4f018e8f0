/// Data models for feed-service
///
/// - `user`: accounts, credentials and the owned-posts back-reference
/// - `post`: posts, validated inputs and the read model joined with creators
pub mod post;
pub mod user;

pub use post::{CreatorSummary, NewPost, Post, PostChanges, PostInput, PostPage, PostView};
pub use user::{NewUser, SignupInput, StatusInput, User, UserProfile, DEFAULT_STATUS};
