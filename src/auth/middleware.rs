//! 访问令牌认证中间件

use crate::{
    auth::jwt::{TokenCodec, TokenKind},
    error::AppError,
};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

/// 认证上下文（附加到请求扩展）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
}

// 实现 FromRequestParts 以便在 handler 中直接提取 AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .ok_or(AppError::Unauthorized)
    }
}

/// 从 Authorization 头提取令牌
///
/// 格式为 `<scheme> <token>`，scheme 不做校验，只取第二段
///
/// The header is split on single spaces, so `Bearer  <token>` (two spaces) yields
/// an empty second segment and is treated as a missing token.
pub fn extract_token(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(' ').nth(1))
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
        .ok_or(AppError::Unauthorized)
}

/// 访问令牌认证中间件
///
/// 只做无状态校验，不查询存储
pub async fn access_token_gate(
    State(codec): State<Arc<TokenCodec>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(req.headers())?;

    let user_id = codec.verify(&token, TokenKind::Access).map_err(|e| {
        tracing::debug!(error = %e, "Access token rejected");
        AppError::Forbidden
    })?;

    req.extensions_mut().insert(AuthContext { user_id });

    Ok(next.run(req).await)
}
