//! 用户管理的 HTTP 处理器

use crate::{
    auth::AuthContext,
    error::AppError,
    handlers::JsonBody,
    middleware::AppState,
    models::user::{UpdateUserRequest, UserResponse},
};
use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// 列出用户
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = state.users.list().await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// 更新用户，只能修改自己
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    if auth_context.user_id != id {
        return Err(AppError::Forbidden);
    }

    let user = state.sessions.update_profile(&id, req).await?;

    Ok(Json(UserResponse::from(user)))
}

/// 删除用户，只能删除自己
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    if auth_context.user_id != id {
        return Err(AppError::Forbidden);
    }

    let user = state
        .users
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;

    if !state.users.delete(&id).await? {
        return Err(AppError::not_found("user"));
    }

    tracing::info!(user_id = %id, "User deleted");

    Ok(Json(UserResponse::from(user)))
}
