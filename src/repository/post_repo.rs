//! Post repository

use super::{bounded, PostStore};
use crate::{
    error::AppError,
    models::post::{NewPost, Post},
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

pub struct PgPostRepository {
    db: PgPool,
    op_timeout: Duration,
}

impl PgPostRepository {
    pub fn new(db: PgPool, op_timeout: Duration) -> Self {
        Self { db, op_timeout }
    }
}

#[async_trait]
impl PostStore for PgPostRepository {
    async fn create(&self, new_post: NewPost) -> Result<Post, AppError> {
        bounded(
            self.op_timeout,
            sqlx::query_as::<_, Post>(
                r#"
                INSERT INTO posts (id, title, content, sender_id)
                VALUES ($1, $2, $3, $4)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&new_post.title)
            .bind(&new_post.content)
            .bind(new_post.sender_id)
            .fetch_one(&self.db),
        )
        .await
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Post>, AppError> {
        bounded(
            self.op_timeout,
            sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.db),
        )
        .await
    }

    async fn list(&self, sender: Option<Uuid>) -> Result<Vec<Post>, AppError> {
        // NULL sender matches everything
        bounded(
            self.op_timeout,
            sqlx::query_as::<_, Post>(
                r#"
                SELECT * FROM posts
                WHERE ($1::uuid IS NULL OR sender_id = $1)
                ORDER BY created_at, id
                "#,
            )
            .bind(sender)
            .fetch_all(&self.db),
        )
        .await
    }

    async fn update(
        &self,
        id: &Uuid,
        title: Option<&str>,
        content: Option<&str>,
    ) -> Result<Option<Post>, AppError> {
        bounded(
            self.op_timeout,
            sqlx::query_as::<_, Post>(
                r#"
                UPDATE posts
                SET
                    title = COALESCE($2, title),
                    content = COALESCE($3, content)
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(title)
            .bind(content)
            .fetch_optional(&self.db),
        )
        .await
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, AppError> {
        // comments go with the post through ON DELETE CASCADE
        let result = bounded(
            self.op_timeout,
            sqlx::query("DELETE FROM posts WHERE id = $1")
                .bind(id)
                .execute(&self.db),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
