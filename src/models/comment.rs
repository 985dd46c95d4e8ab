//! Comment models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub message: String,
    pub post_id: Uuid,
    pub sender_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, message = "message is required"))]
    pub message: String,
    pub post_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1, message = "message is required"))]
    pub message: String,
}

/// Fields needed to insert a comment
#[derive(Debug, Clone)]
pub struct NewComment {
    pub message: String,
    pub post_id: Uuid,
    pub sender_id: Uuid,
}
