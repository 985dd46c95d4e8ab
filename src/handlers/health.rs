//! 健康检查处理器
//! 提供 /health 和 /ready 端点

use axum::{extract::State, http::StatusCode, Json};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::{sync::Arc, time::Instant};

use crate::middleware::AppState;

/// 应用启动时间
static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

/// 存活探针响应
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// 就绪探针响应
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: Vec<HealthCheck>,
}

/// 健康检查项
#[derive(Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// 记录启动时间，在 main 中尽早调用
pub fn set_start_time() {
    Lazy::force(&START_TIME);
}

/// 获取应用运行时间（秒）
pub fn get_uptime() -> u64 {
    START_TIME.elapsed().as_secs()
}

/// 存活探针
/// 快速响应，不检查依赖
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: get_uptime(),
    })
}

/// 就绪探针
/// 检查存储连通性，不可用时返回 503
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let store = match state.users.ping().await {
        Ok(()) => HealthCheck {
            name: "store".to_string(),
            status: "healthy".to_string(),
            message: None,
        },
        Err(e) => HealthCheck {
            name: "store".to_string(),
            status: "unhealthy".to_string(),
            message: Some(e.user_message()),
        },
    };

    let checks = vec![store];
    let ready = checks.iter().all(|c| c.status == "healthy");
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(ReadinessResponse { ready, checks }))
}
