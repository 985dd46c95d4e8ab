//! 测试公共模块
//! 提供测试配置、内存存储上的应用实例和 HTTP 辅助函数

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use board_service::{
    config::{
        AppConfig, DatabaseConfig, LoggingConfig, SecurityConfig, ServerConfig, MEMORY_STORE_URL,
    },
    error::AppError,
    middleware::AppState,
    models::user::{NewUser, User},
    repository::{CommentStore, MemoryStore, PostStore, TokenListUpdate, UserStore},
    routes,
};
use http_body_util::BodyExt;
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tower::ServiceExt;
use uuid::Uuid;

pub const ACCESS_SECRET: &str = "test-access-secret-for-testing-only-32+";
pub const REFRESH_SECRET: &str = "test-refresh-secret-for-testing-only-32+";
pub const ACCESS_TOKEN_EXP_SECS: u64 = 60;

/// 创建测试配置（内存存储，低成本哈希参数）
pub fn create_test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            graceful_shutdown_timeout_secs: 5,
        },
        database: DatabaseConfig {
            url: Secret::new(MEMORY_STORE_URL.to_string()),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
            operation_timeout_secs: 5,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            access_token_secret: Secret::new(ACCESS_SECRET.to_string()),
            refresh_token_secret: Secret::new(REFRESH_SECRET.to_string()),
            access_token_exp_secs: ACCESS_TOKEN_EXP_SECS,
            hash_memory_kib: argon2::Params::MIN_M_COST * 8,
            hash_iterations: 1,
            hash_parallelism: 1,
        },
    }
}

/// 在指定的用户存储上创建应用状态，帖子和评论使用内存存储
pub fn create_test_state_with_users(users: Arc<dyn UserStore>) -> Arc<AppState> {
    let store = Arc::new(MemoryStore::new());
    Arc::new(
        AppState::new(
            create_test_config(),
            users,
            store.clone() as Arc<dyn PostStore>,
            store as Arc<dyn CommentStore>,
        )
        .expect("Failed to create test app state"),
    )
}

/// 创建测试应用状态（全部内存存储）
pub fn create_test_app_state() -> Arc<AppState> {
    create_test_state_with_users(Arc::new(MemoryStore::new()))
}

/// 创建测试应用
pub fn create_test_app() -> (Router, Arc<AppState>) {
    let state = create_test_app_state();
    (routes::create_router(state.clone()), state)
}

/// 发送请求，返回状态码与 JSON 响应体（非 JSON 时为字符串，空响应为 Null）
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    authorization: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();

    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json)
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// 注册用户，返回响应体
pub async fn register(app: &Router, username: &str, password: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/registration",
        None,
        Some(json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": password,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "registration failed: {}", body);

    body
}

/// 登录，返回 (access_token, refresh_token)
pub async fn login(app: &Router, username: &str, password: &str) -> (String, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);

    (
        body["accessToken"].as_str().unwrap().to_string(),
        body["refreshToken"].as_str().unwrap().to_string(),
    )
}

/// 注册并登录，返回 (user_id, access_token, refresh_token)
pub async fn register_and_login(app: &Router, username: &str) -> (String, String, String) {
    let user = register(app, username, "dan123").await;
    let (access, refresh) = login(app, username, "dan123").await;

    (user["id"].as_str().unwrap().to_string(), access, refresh)
}

/// 故障注入用户存储
///
/// Delegates to a `MemoryStore`. `fail_clear` makes only list clearing fail,
/// `fail_all` makes every call fail, both with `StoreUnavailable`.
#[derive(Default)]
pub struct FlakyUserStore {
    pub inner: MemoryStore,
    pub fail_clear: AtomicBool,
    pub fail_all: AtomicBool,
}

impl FlakyUserStore {
    fn check(&self) -> Result<(), AppError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(AppError::StoreUnavailable("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl UserStore for FlakyUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        self.check()?;
        UserStore::create(&self.inner, new_user).await
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, AppError> {
        self.check()?;
        UserStore::find_by_id(&self.inner, id).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        self.check()?;
        self.inner.find_by_username(username).await
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        self.check()?;
        UserStore::list(&self.inner).await
    }

    async fn update_profile(
        &self,
        id: &Uuid,
        email: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        self.check()?;
        self.inner.update_profile(id, email, password_hash).await
    }

    async fn update_password(&self, id: &Uuid, password_hash: &str) -> Result<bool, AppError> {
        self.check()?;
        self.inner.update_password(id, password_hash).await
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, AppError> {
        self.check()?;
        UserStore::delete(&self.inner, id).await
    }

    async fn append_refresh_token(
        &self,
        id: &Uuid,
        token: &str,
    ) -> Result<TokenListUpdate, AppError> {
        self.check()?;
        self.inner.append_refresh_token(id, token).await
    }

    async fn replace_refresh_token(
        &self,
        id: &Uuid,
        old: &str,
        new: &str,
    ) -> Result<TokenListUpdate, AppError> {
        self.check()?;
        self.inner.replace_refresh_token(id, old, new).await
    }

    async fn remove_refresh_token(
        &self,
        id: &Uuid,
        token: &str,
    ) -> Result<TokenListUpdate, AppError> {
        self.check()?;
        self.inner.remove_refresh_token(id, token).await
    }

    async fn clear_refresh_tokens(&self, id: &Uuid) -> Result<TokenListUpdate, AppError> {
        self.check()?;
        if self.fail_clear.load(Ordering::SeqCst) {
            return Err(AppError::StoreUnavailable("injected failure".to_string()));
        }
        self.inner.clear_refresh_tokens(id).await
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.check()?;
        self.inner.ping().await
    }
}
