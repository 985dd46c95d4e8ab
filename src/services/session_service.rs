//! 会话服务：注册、登录、登出、令牌轮换
//!
//! A user's refresh tokens are valid exactly while they sit in the user's stored
//! list. Presenting a token that verifies but is no longer listed means it was
//! already rotated or logged out, so the whole list is revoked.

use crate::{
    auth::{PasswordHasher, TokenCodec, TokenKind, TokenPair},
    error::AppError,
    models::user::{NewUser, RegisterRequest, UpdateUserRequest, User},
    repository::{TokenListUpdate, UserStore},
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub struct SessionManager {
    users: Arc<dyn UserStore>,
    codec: Arc<TokenCodec>,
    hasher: PasswordHasher,
    /// Verified against for unknown usernames so both failure paths cost the same
    dummy_hash: String,
}

impl SessionManager {
    pub fn new(
        users: Arc<dyn UserStore>,
        codec: Arc<TokenCodec>,
        hasher: PasswordHasher,
    ) -> Result<Self, AppError> {
        let dummy_hash = hasher.hash(&Uuid::new_v4().to_string())?;

        Ok(Self {
            users,
            codec,
            hasher,
            dummy_hash,
        })
    }

    /// 注册新用户
    pub async fn register(&self, req: RegisterRequest) -> Result<User, AppError> {
        let (username, email, password) = match (req.username, req.email, req.password) {
            (Some(u), Some(e), Some(p)) if !u.is_empty() && !e.is_empty() && !p.is_empty() => {
                (u, e, p)
            }
            _ => return Err(AppError::invalid_input("user details are missing")),
        };

        if self.users.find_by_username(&username).await?.is_some() {
            return Err(AppError::Conflict("user already exist".to_string()));
        }

        let password_hash = self.hasher.hash_blocking(password).await?;

        // the store enforces uniqueness too, for registrations racing past the check above
        let user = self
            .users
            .create(NewUser {
                username,
                email,
                password_hash,
            })
            .await?;

        info!(user_id = %user.id, "User registered");
        metrics::counter!("auth_registrations_total").increment(1);

        Ok(user)
    }

    /// 用户登录
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AppError> {
        let user = match self.users.find_by_username(username).await? {
            Some(user) => user,
            None => {
                let _ = self
                    .hasher
                    .verify_blocking(password.to_string(), self.dummy_hash.clone())
                    .await;
                return Err(Self::login_failed());
            }
        };

        if !self
            .hasher
            .verify_blocking(password.to_string(), user.password_hash.clone())
            .await
        {
            return Err(Self::login_failed());
        }

        let pair = self.codec.issue_pair(&user.id)?;

        match self.users.append_refresh_token(&user.id, &pair.refresh_token).await? {
            TokenListUpdate::Updated => {}
            // deleted between lookup and append
            TokenListUpdate::NotListed | TokenListUpdate::UserMissing => {
                return Err(Self::login_failed());
            }
        }

        info!(user_id = %user.id, "User logged in");
        metrics::counter!("auth_logins_total", "outcome" => "success").increment(1);

        Ok(pair)
    }

    fn login_failed() -> AppError {
        metrics::counter!("auth_logins_total", "outcome" => "failure").increment(1);
        AppError::InvalidCredentials
    }

    /// 轮换刷新令牌
    ///
    /// The presented token is replaced in place by a fresh one, so the list keeps its size.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let user_id = self.verify_refresh_token(refresh_token)?;
        let new_refresh_token = self.codec.issue_refresh_token(&user_id)?;

        match self
            .users
            .replace_refresh_token(&user_id, refresh_token, &new_refresh_token)
            .await?
        {
            TokenListUpdate::Updated => {}
            TokenListUpdate::NotListed => return Err(self.revoke_all(&user_id).await),
            TokenListUpdate::UserMissing => {
                return Err(AppError::InvalidToken("unknown subject".to_string()))
            }
        }

        let access_token = self.codec.issue_access_token(&user_id)?;

        info!(user_id = %user_id, "Refresh token rotated");
        metrics::counter!("auth_refreshes_total").increment(1);

        Ok(TokenPair {
            access_token,
            refresh_token: new_refresh_token,
            expires_in: self.codec.access_token_exp_secs(),
        })
    }

    /// 登出：从列表中移除刷新令牌
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AppError> {
        let user_id = self.verify_refresh_token(refresh_token)?;

        match self.users.remove_refresh_token(&user_id, refresh_token).await? {
            TokenListUpdate::Updated => {
                info!(user_id = %user_id, "User logged out");
                Ok(())
            }
            TokenListUpdate::NotListed => Err(self.revoke_all(&user_id).await),
            TokenListUpdate::UserMissing => {
                Err(AppError::InvalidToken("unknown subject".to_string()))
            }
        }
    }

    /// Change the password; outstanding sessions are left as they are
    pub async fn update_password(&self, user_id: &Uuid, password: String) -> Result<(), AppError> {
        if password.is_empty() {
            return Err(AppError::invalid_input("password must not be empty"));
        }

        let password_hash = self.hasher.hash_blocking(password).await?;
        if !self.users.update_password(user_id, &password_hash).await? {
            return Err(AppError::not_found("user"));
        }

        info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    /// Apply a partial profile update (email and/or password)
    ///
    /// Every field is checked and the password hashed before the single store
    /// write, so a rejected request changes nothing.
    pub async fn update_profile(
        &self,
        user_id: &Uuid,
        req: UpdateUserRequest,
    ) -> Result<User, AppError> {
        if req.email.is_none() && req.password.is_none() {
            return Err(AppError::invalid_input("nothing to update"));
        }
        if req.email.as_deref() == Some("") {
            return Err(AppError::invalid_input("email must not be empty"));
        }
        if req.password.as_deref() == Some("") {
            return Err(AppError::invalid_input("password must not be empty"));
        }

        let password_hash = match req.password {
            Some(password) => Some(self.hasher.hash_blocking(password).await?),
            None => None,
        };

        let user = self
            .users
            .update_profile(user_id, req.email.as_deref(), password_hash.as_deref())
            .await?
            .ok_or_else(|| AppError::not_found("user"))?;

        info!(user_id = %user_id, "Profile updated");
        Ok(user)
    }

    fn verify_refresh_token(&self, token: &str) -> Result<Uuid, AppError> {
        self.codec
            .verify(token, TokenKind::Refresh)
            .map_err(|e| AppError::InvalidToken(e.to_string()))
    }

    /// Clear every refresh token of a user after reuse was detected.
    ///
    /// Returns the error to hand back: `TokenReuse` once the list is cleared, or the
    /// store error if clearing failed.
    async fn revoke_all(&self, user_id: &Uuid) -> AppError {
        warn!(user_id = %user_id, "Refresh token reuse detected, revoking all sessions");
        metrics::counter!("auth_token_reuse_total").increment(1);

        match self.users.clear_refresh_tokens(user_id).await {
            Ok(_) => AppError::TokenReuse,
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Failed to revoke sessions");
                e
            }
        }
    }
}
