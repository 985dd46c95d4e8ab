//! 帖子 HTTP 处理器

use crate::{
    auth::AuthContext,
    error::AppError,
    handlers::JsonBody,
    middleware::AppState,
    models::post::{CreatePostRequest, NewPost, Post, PostQuery, UpdatePostRequest},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PostQuery>,
) -> Result<Json<Vec<Post>>, AppError> {
    Ok(Json(state.posts.list(query.sender).await?))
}

pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Post>, AppError> {
    let post = state
        .posts
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found("post"))?;

    Ok(Json(post))
}

/// 发帖，sender 取自访问令牌
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    JsonBody(req): JsonBody<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    req.validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let post = state
        .posts
        .create(NewPost {
            title: req.title,
            content: req.content,
            sender_id: auth_context.user_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update_post(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<UpdatePostRequest>,
) -> Result<Json<Post>, AppError> {
    req.validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    owned_post(&state, &id, &auth_context).await?;

    let post = state
        .posts
        .update(&id, req.title.as_deref(), req.content.as_deref())
        .await?
        .ok_or_else(|| AppError::not_found("post"))?;

    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Post>, AppError> {
    let post = owned_post(&state, &id, &auth_context).await?;

    if !state.posts.delete(&id).await? {
        return Err(AppError::not_found("post"));
    }

    Ok(Json(post))
}

/// 404 if the post is absent, 403 if the caller did not send it
async fn owned_post(state: &AppState, id: &Uuid, auth_context: &AuthContext) -> Result<Post, AppError> {
    let post = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("post"))?;

    if post.sender_id != auth_context.user_id {
        return Err(AppError::Forbidden);
    }

    Ok(post)
}
