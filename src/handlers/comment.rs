//! 评论 HTTP 处理器

use crate::{
    auth::AuthContext,
    error::AppError,
    handlers::JsonBody,
    middleware::AppState,
    models::comment::{Comment, CreateCommentRequest, NewComment, UpdateCommentRequest},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub async fn list_comments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Comment>>, AppError> {
    Ok(Json(state.comments.list().await?))
}

pub async fn list_post_comments(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, AppError> {
    Ok(Json(state.comments.list_by_post(&post_id).await?))
}

pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    JsonBody(req): JsonBody<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    req.validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    if state.posts.find_by_id(&req.post_id).await?.is_none() {
        return Err(AppError::not_found("post"));
    }

    let comment = state
        .comments
        .create(NewComment {
            message: req.message,
            post_id: req.post_id,
            sender_id: auth_context.user_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn update_comment(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<UpdateCommentRequest>,
) -> Result<Json<Comment>, AppError> {
    req.validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    owned_comment(&state, &id, &auth_context).await?;

    let comment = state
        .comments
        .update_message(&id, &req.message)
        .await?
        .ok_or_else(|| AppError::not_found("comment"))?;

    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Comment>, AppError> {
    let comment = owned_comment(&state, &id, &auth_context).await?;

    if !state.comments.delete(&id).await? {
        return Err(AppError::not_found("comment"));
    }

    Ok(Json(comment))
}

async fn owned_comment(
    state: &AppState,
    id: &Uuid,
    auth_context: &AuthContext,
) -> Result<Comment, AppError> {
    let comment = state
        .comments
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("comment"))?;

    if comment.sender_id != auth_context.user_id {
        return Err(AppError::Forbidden);
    }

    Ok(comment)
}
