//! HTTP 中间件与共享状态
//! 请求追踪（trace_id / request_id、日志、指标）

use crate::{
    auth::{PasswordHasher, TokenCodec},
    config::AppConfig,
    error::AppError,
    repository::{CommentStore, PostStore, UserStore},
    services::SessionManager,
};
use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// 应用状态
///
/// Stores are trait objects so the same router runs over Postgres or memory.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub posts: Arc<dyn PostStore>,
    pub comments: Arc<dyn CommentStore>,
    pub token_codec: Arc<TokenCodec>,
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    /// Build the codec, hasher and session manager over the given stores
    pub fn new(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        posts: Arc<dyn PostStore>,
        comments: Arc<dyn CommentStore>,
    ) -> Result<Self, AppError> {
        let token_codec = Arc::new(TokenCodec::from_config(&config.security)?);
        let hasher = PasswordHasher::from_config(&config.security)?;
        let sessions = Arc::new(SessionManager::new(
            users.clone(),
            token_codec.clone(),
            hasher,
        )?);

        Ok(Self {
            config: Arc::new(config),
            users,
            posts,
            comments,
            token_codec,
            sessions,
        })
    }
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().clone();
    let uri = req.uri().path().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    async move {
        let start = Instant::now();
        let mut response = next.run(req).await;
        let elapsed = start.elapsed();

        let status = response.status().as_u16();
        // 指标标签只使用静态字符串，避免基数爆炸
        let method_name = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            "PATCH" => "PATCH",
            _ => "UNKNOWN",
        };
        let status_class = match status {
            200..=299 => "2xx",
            400..=499 => "4xx",
            500..=599 => "5xx",
            _ => "other",
        };

        metrics::counter!("http_requests_total", "method" => method_name, "status" => status_class)
            .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            status = status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty() && s.len() <= 128)
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_id_passthrough() {
        let mut headers = HeaderMap::new();
        headers.insert("x-trace-id", "abc-123".parse().unwrap());
        assert_eq!(extract_or_generate_trace_id(&headers), "abc-123");
    }

    #[test]
    fn test_trace_id_generated_when_absent() {
        let id = extract_or_generate_trace_id(&HeaderMap::new());
        assert!(Uuid::parse_str(&id).is_ok());
    }
}
