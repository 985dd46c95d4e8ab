//! 认证相关的 HTTP 处理器

use crate::{
    auth::{extract_token, TokenPair},
    error::AppError,
    middleware::AppState,
    models::{
        auth::LoginRequest,
        user::{RegisterRequest, RegistrationResponse},
    },
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;

/// 注册
///
/// An unreadable body is treated like one with every field missing.
pub async fn registration(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegistrationResponse>), AppError> {
    let req = payload.map(|Json(req)| req).unwrap_or_default();
    let user = state.sessions.register(req).await?;

    Ok((StatusCode::CREATED, Json(RegistrationResponse::from(user))))
}

/// 登录
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenPair>, AppError> {
    let req = payload.map(|Json(req)| req).unwrap_or_default();
    let pair = state.sessions.login(&req.username, &req.password).await?;

    Ok(Json(pair))
}

/// 登出，刷新令牌放在 Authorization 头
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let token = extract_token(&headers)?;
    state.sessions.logout(&token).await?;

    Ok(StatusCode::OK)
}

/// 刷新令牌
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TokenPair>, AppError> {
    let token = extract_token(&headers)?;
    let pair = state.sessions.refresh(&token).await?;

    Ok(Json(pair))
}
