//! Comment repository

use super::{bounded, CommentStore};
use crate::{
    error::AppError,
    models::comment::{Comment, NewComment},
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

pub struct PgCommentRepository {
    db: PgPool,
    op_timeout: Duration,
}

impl PgCommentRepository {
    pub fn new(db: PgPool, op_timeout: Duration) -> Self {
        Self { db, op_timeout }
    }
}

#[async_trait]
impl CommentStore for PgCommentRepository {
    async fn create(&self, new_comment: NewComment) -> Result<Comment, AppError> {
        bounded(
            self.op_timeout,
            sqlx::query_as::<_, Comment>(
                r#"
                INSERT INTO comments (id, message, post_id, sender_id)
                VALUES ($1, $2, $3, $4)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&new_comment.message)
            .bind(new_comment.post_id)
            .bind(new_comment.sender_id)
            .fetch_one(&self.db),
        )
        .await
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Comment>, AppError> {
        bounded(
            self.op_timeout,
            sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.db),
        )
        .await
    }

    async fn list(&self) -> Result<Vec<Comment>, AppError> {
        bounded(
            self.op_timeout,
            sqlx::query_as::<_, Comment>("SELECT * FROM comments ORDER BY created_at, id")
                .fetch_all(&self.db),
        )
        .await
    }

    async fn list_by_post(&self, post_id: &Uuid) -> Result<Vec<Comment>, AppError> {
        bounded(
            self.op_timeout,
            sqlx::query_as::<_, Comment>(
                "SELECT * FROM comments WHERE post_id = $1 ORDER BY created_at, id",
            )
            .bind(post_id)
            .fetch_all(&self.db),
        )
        .await
    }

    async fn update_message(&self, id: &Uuid, message: &str) -> Result<Option<Comment>, AppError> {
        bounded(
            self.op_timeout,
            sqlx::query_as::<_, Comment>(
                "UPDATE comments SET message = $2 WHERE id = $1 RETURNING *",
            )
            .bind(id)
            .bind(message)
            .fetch_optional(&self.db),
        )
        .await
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, AppError> {
        let result = bounded(
            self.op_timeout,
            sqlx::query("DELETE FROM comments WHERE id = $1")
                .bind(id)
                .execute(&self.db),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
