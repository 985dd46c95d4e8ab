//! In-process store backing all three store traits
//!
//! Selected with `database.url = "memory://"`. State sits behind one `RwLock`, so each
//! mutation is atomic with respect to every other.

use super::{CommentStore, PostStore, TokenListUpdate, UserStore};
use crate::{
    error::AppError,
    models::{
        comment::{Comment, NewComment},
        post::{NewPost, Post},
        user::{NewUser, User},
    },
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `update` to one user's token list under the write lock
    async fn with_tokens<F>(&self, id: &Uuid, update: F) -> TokenListUpdate
    where
        F: FnOnce(&mut Vec<String>) -> bool,
    {
        let mut state = self.state.write().await;
        match state.users.get_mut(id) {
            Some(user) => {
                if update(&mut user.refresh_tokens) {
                    user.updated_at = Utc::now();
                    TokenListUpdate::Updated
                } else {
                    TokenListUpdate::NotListed
                }
            }
            None => TokenListUpdate::UserMissing,
        }
    }
}

fn sorted<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by_key(|item| key(item));
    items
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.username == new_user.username) {
            return Err(AppError::Conflict("user already exist".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            refresh_tokens: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, AppError> {
        Ok(self.state.read().await.users.get(id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let users: Vec<User> = self.state.read().await.users.values().cloned().collect();
        Ok(sorted(users, |u| (u.created_at, u.id)))
    }

    async fn update_profile(
        &self,
        id: &Uuid,
        email: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        let mut state = self.state.write().await;
        Ok(state.users.get_mut(id).map(|user| {
            if let Some(email) = email {
                user.email = email.to_string();
            }
            if let Some(password_hash) = password_hash {
                user.password_hash = password_hash.to_string();
            }
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn update_password(&self, id: &Uuid, password_hash: &str) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        Ok(match state.users.get_mut(id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, AppError> {
        Ok(self.state.write().await.users.remove(id).is_some())
    }

    async fn append_refresh_token(
        &self,
        id: &Uuid,
        token: &str,
    ) -> Result<TokenListUpdate, AppError> {
        Ok(self
            .with_tokens(id, |tokens| {
                tokens.push(token.to_string());
                true
            })
            .await)
    }

    async fn replace_refresh_token(
        &self,
        id: &Uuid,
        old: &str,
        new: &str,
    ) -> Result<TokenListUpdate, AppError> {
        Ok(self
            .with_tokens(id, |tokens| match tokens.iter().position(|t| t == old) {
                Some(index) => {
                    tokens[index] = new.to_string();
                    true
                }
                None => false,
            })
            .await)
    }

    async fn remove_refresh_token(
        &self,
        id: &Uuid,
        token: &str,
    ) -> Result<TokenListUpdate, AppError> {
        Ok(self
            .with_tokens(id, |tokens| {
                let before = tokens.len();
                tokens.retain(|t| t != token);
                tokens.len() != before
            })
            .await)
    }

    async fn clear_refresh_tokens(&self, id: &Uuid) -> Result<TokenListUpdate, AppError> {
        Ok(self
            .with_tokens(id, |tokens| {
                tokens.clear();
                true
            })
            .await)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn create(&self, new_post: NewPost) -> Result<Post, AppError> {
        let post = Post {
            id: Uuid::new_v4(),
            title: new_post.title,
            content: new_post.content,
            sender_id: new_post.sender_id,
            created_at: Utc::now(),
        };
        self.state.write().await.posts.insert(post.id, post.clone());

        Ok(post)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Post>, AppError> {
        Ok(self.state.read().await.posts.get(id).cloned())
    }

    async fn list(&self, sender: Option<Uuid>) -> Result<Vec<Post>, AppError> {
        let state = self.state.read().await;
        let posts: Vec<Post> = state
            .posts
            .values()
            .filter(|p| sender.map_or(true, |s| p.sender_id == s))
            .cloned()
            .collect();

        Ok(sorted(posts, |p| (p.created_at, p.id)))
    }

    async fn update(
        &self,
        id: &Uuid,
        title: Option<&str>,
        content: Option<&str>,
    ) -> Result<Option<Post>, AppError> {
        let mut state = self.state.write().await;
        Ok(state.posts.get_mut(id).map(|post| {
            if let Some(title) = title {
                post.title = title.to_string();
            }
            if let Some(content) = content {
                post.content = Some(content.to_string());
            }
            post.clone()
        }))
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        if state.posts.remove(id).is_none() {
            return Ok(false);
        }
        state.comments.retain(|_, c| c.post_id != *id);

        Ok(true)
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn create(&self, new_comment: NewComment) -> Result<Comment, AppError> {
        let mut state = self.state.write().await;
        if !state.posts.contains_key(&new_comment.post_id) {
            return Err(AppError::not_found("referenced record"));
        }

        let comment = Comment {
            id: Uuid::new_v4(),
            message: new_comment.message,
            post_id: new_comment.post_id,
            sender_id: new_comment.sender_id,
            created_at: Utc::now(),
        };
        state.comments.insert(comment.id, comment.clone());

        Ok(comment)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Comment>, AppError> {
        Ok(self.state.read().await.comments.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Comment>, AppError> {
        let comments: Vec<Comment> =
            self.state.read().await.comments.values().cloned().collect();
        Ok(sorted(comments, |c| (c.created_at, c.id)))
    }

    async fn list_by_post(&self, post_id: &Uuid) -> Result<Vec<Comment>, AppError> {
        let state = self.state.read().await;
        let comments: Vec<Comment> = state
            .comments
            .values()
            .filter(|c| c.post_id == *post_id)
            .cloned()
            .collect();

        Ok(sorted(comments, |c| (c.created_at, c.id)))
    }

    async fn update_message(&self, id: &Uuid, message: &str) -> Result<Option<Comment>, AppError> {
        let mut state = self.state.write().await;
        Ok(state.comments.get_mut(id).map(|comment| {
            comment.message = message.to_string();
            comment.clone()
        }))
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, AppError> {
        Ok(self.state.write().await.comments.remove(id).is_some())
    }
}
