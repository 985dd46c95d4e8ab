//! Storage layer
//!
//! Handlers and services only see the store traits below. `memory` backs them with
//! in-process maps, the `*_repo` modules with Postgres.

pub mod comment_repo;
pub mod memory;
pub mod post_repo;
pub mod user_repo;

pub use comment_repo::PgCommentRepository;
pub use memory::MemoryStore;
pub use post_repo::PgPostRepository;
pub use user_repo::PgUserRepository;

use crate::{
    error::AppError,
    models::{
        comment::{Comment, NewComment},
        post::{NewPost, Post},
        user::{NewUser, User},
    },
};
use async_trait::async_trait;
use std::{future::Future, time::Duration};
use uuid::Uuid;

/// Outcome of a conditional update on a user's refresh token list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenListUpdate {
    /// The list was changed
    Updated,
    /// The user exists but the expected token is not in its list
    NotListed,
    /// No user with that id
    UserMissing,
}

/// Credential store
///
/// Every refresh-token operation is a single atomic update scoped to one user.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user with an empty refresh token list. Duplicate username is `Conflict`.
    async fn create(&self, new_user: NewUser) -> Result<User, AppError>;

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, AppError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    async fn list(&self) -> Result<Vec<User>, AppError>;

    /// Set whichever of email and password hash are given, in one write
    async fn update_profile(
        &self,
        id: &Uuid,
        email: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<Option<User>, AppError>;

    async fn update_password(&self, id: &Uuid, password_hash: &str) -> Result<bool, AppError>;

    async fn delete(&self, id: &Uuid) -> Result<bool, AppError>;

    /// Append `token` to the end of the list
    async fn append_refresh_token(&self, id: &Uuid, token: &str)
        -> Result<TokenListUpdate, AppError>;

    /// Replace the first occurrence of `old` with `new`, keeping its position
    async fn replace_refresh_token(
        &self,
        id: &Uuid,
        old: &str,
        new: &str,
    ) -> Result<TokenListUpdate, AppError>;

    /// Remove every occurrence of `token`
    async fn remove_refresh_token(&self, id: &Uuid, token: &str)
        -> Result<TokenListUpdate, AppError>;

    /// Empty the list
    async fn clear_refresh_tokens(&self, id: &Uuid) -> Result<TokenListUpdate, AppError>;

    /// Connectivity probe
    async fn ping(&self) -> Result<(), AppError>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create(&self, new_post: NewPost) -> Result<Post, AppError>;

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Post>, AppError>;

    /// All posts, oldest first, optionally only those of one sender
    async fn list(&self, sender: Option<Uuid>) -> Result<Vec<Post>, AppError>;

    async fn update(
        &self,
        id: &Uuid,
        title: Option<&str>,
        content: Option<&str>,
    ) -> Result<Option<Post>, AppError>;

    /// Delete the post and its comments
    async fn delete(&self, id: &Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn create(&self, new_comment: NewComment) -> Result<Comment, AppError>;

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Comment>, AppError>;

    async fn list(&self) -> Result<Vec<Comment>, AppError>;

    async fn list_by_post(&self, post_id: &Uuid) -> Result<Vec<Comment>, AppError>;

    async fn update_message(&self, id: &Uuid, message: &str) -> Result<Option<Comment>, AppError>;

    async fn delete(&self, id: &Uuid) -> Result<bool, AppError>;
}

/// Run a query under the store's operation timeout
pub(crate) async fn bounded<T, F>(limit: Duration, query: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(limit, query).await {
        Ok(result) => result.map_err(AppError::from),
        Err(_) => Err(AppError::StoreUnavailable(format!(
            "store operation timed out after {}ms",
            limit.as_millis()
        ))),
    }
}
