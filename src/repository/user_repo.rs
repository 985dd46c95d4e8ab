//! User repository (数据库访问层)
//!
//! Refresh token lists live in a `TEXT[]` column. Each list mutation is one
//! conditional `UPDATE`, so concurrent refreshes of the same token cannot both win.

use super::{bounded, TokenListUpdate, UserStore};
use crate::{
    error::AppError,
    models::user::{NewUser, User},
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

pub struct PgUserRepository {
    db: PgPool,
    op_timeout: Duration,
}

impl PgUserRepository {
    pub fn new(db: PgPool, op_timeout: Duration) -> Self {
        Self { db, op_timeout }
    }

    /// Tell `NotListed` from `UserMissing` after an update touched no rows
    async fn miss_reason(&self, id: &Uuid) -> Result<TokenListUpdate, AppError> {
        let exists = bounded(
            self.op_timeout,
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.db),
        )
        .await?;

        Ok(if exists {
            TokenListUpdate::NotListed
        } else {
            TokenListUpdate::UserMissing
        })
    }

    async fn conditional_update(
        &self,
        id: &Uuid,
        rows_affected: u64,
    ) -> Result<TokenListUpdate, AppError> {
        if rows_affected > 0 {
            Ok(TokenListUpdate::Updated)
        } else {
            self.miss_reason(id).await
        }
    }
}

#[async_trait]
impl UserStore for PgUserRepository {
    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        let user = bounded(
            self.op_timeout,
            sqlx::query_as::<_, User>(
                r#"
                INSERT INTO users (id, username, email, password_hash)
                VALUES ($1, $2, $3, $4)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .fetch_one(&self.db),
        )
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, AppError> {
        bounded(
            self.op_timeout,
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.db),
        )
        .await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        bounded(
            self.op_timeout,
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
                .bind(username)
                .fetch_optional(&self.db),
        )
        .await
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        bounded(
            self.op_timeout,
            sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at, id")
                .fetch_all(&self.db),
        )
        .await
    }

    async fn update_profile(
        &self,
        id: &Uuid,
        email: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        bounded(
            self.op_timeout,
            sqlx::query_as::<_, User>(
                r#"
                UPDATE users
                SET
                    email = COALESCE($2, email),
                    password_hash = COALESCE($3, password_hash),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(email)
            .bind(password_hash)
            .fetch_optional(&self.db),
        )
        .await
    }

    async fn update_password(&self, id: &Uuid, password_hash: &str) -> Result<bool, AppError> {
        let result = bounded(
            self.op_timeout,
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.db),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, AppError> {
        let result = bounded(
            self.op_timeout,
            sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(id)
                .execute(&self.db),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn append_refresh_token(
        &self,
        id: &Uuid,
        token: &str,
    ) -> Result<TokenListUpdate, AppError> {
        let result = bounded(
            self.op_timeout,
            sqlx::query(
                r#"
                UPDATE users
                SET refresh_tokens = array_append(refresh_tokens, $2), updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(token)
            .execute(&self.db),
        )
        .await?;

        if result.rows_affected() > 0 {
            Ok(TokenListUpdate::Updated)
        } else {
            Ok(TokenListUpdate::UserMissing)
        }
    }

    async fn replace_refresh_token(
        &self,
        id: &Uuid,
        old: &str,
        new: &str,
    ) -> Result<TokenListUpdate, AppError> {
        // Splice around the first occurrence; the WHERE clause makes the swap
        // conditional on the old token still being listed
        let result = bounded(
            self.op_timeout,
            sqlx::query(
                r#"
                UPDATE users
                SET refresh_tokens =
                        refresh_tokens[:array_position(refresh_tokens, $2) - 1]
                        || $3::text
                        || refresh_tokens[array_position(refresh_tokens, $2) + 1:],
                    updated_at = NOW()
                WHERE id = $1 AND array_position(refresh_tokens, $2) IS NOT NULL
                "#,
            )
            .bind(id)
            .bind(old)
            .bind(new)
            .execute(&self.db),
        )
        .await?;

        self.conditional_update(id, result.rows_affected()).await
    }

    async fn remove_refresh_token(
        &self,
        id: &Uuid,
        token: &str,
    ) -> Result<TokenListUpdate, AppError> {
        let result = bounded(
            self.op_timeout,
            sqlx::query(
                r#"
                UPDATE users
                SET refresh_tokens = array_remove(refresh_tokens, $2), updated_at = NOW()
                WHERE id = $1 AND $2 = ANY(refresh_tokens)
                "#,
            )
            .bind(id)
            .bind(token)
            .execute(&self.db),
        )
        .await?;

        self.conditional_update(id, result.rows_affected()).await
    }

    async fn clear_refresh_tokens(&self, id: &Uuid) -> Result<TokenListUpdate, AppError> {
        let result = bounded(
            self.op_timeout,
            sqlx::query("UPDATE users SET refresh_tokens = '{}', updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&self.db),
        )
        .await?;

        if result.rows_affected() > 0 {
            Ok(TokenListUpdate::Updated)
        } else {
            Ok(TokenListUpdate::UserMissing)
        }
    }

    async fn ping(&self) -> Result<(), AppError> {
        bounded(
            self.op_timeout,
            sqlx::query("SELECT 1").execute(&self.db),
        )
        .await
        .map(|_| ())
    }
}
