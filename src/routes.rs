//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::{auth::access_token_gate, handlers, middleware::AppState};

/// 请求体上限
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// 创建应用路由
///
/// Reads are public. Writes on resources pass through the access-token gate, which
/// is attached per method so a public GET and a gated POST can share a path.
pub fn create_router(state: Arc<AppState>) -> Router {
    let gate = axum::middleware::from_fn_with_state(state.token_codec.clone(), access_token_gate);

    // 公开端点（健康检查）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    // 认证路由，令牌由处理器自行校验
    let auth_routes = Router::new()
        .route("/auth/registration", post(handlers::auth::registration))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/refreshToken", post(handlers::auth::refresh_token));

    let post_routes = Router::new()
        .route(
            "/posts",
            get(handlers::post::list_posts)
                .merge(post(handlers::post::create_post).route_layer(gate.clone())),
        )
        .route(
            "/posts/{id}",
            get(handlers::post::get_post).merge(
                put(handlers::post::update_post)
                    .delete(handlers::post::delete_post)
                    .route_layer(gate.clone()),
            ),
        );

    let comment_routes = Router::new()
        .route(
            "/comments",
            get(handlers::comment::list_comments)
                .merge(post(handlers::comment::create_comment).route_layer(gate.clone())),
        )
        .route(
            "/comments/post/{post_id}",
            get(handlers::comment::list_post_comments),
        )
        .route(
            "/comments/{id}",
            put(handlers::comment::update_comment)
                .delete(handlers::comment::delete_comment)
                .route_layer(gate.clone()),
        );

    let user_routes = Router::new()
        .route("/users", get(handlers::user::list_users))
        .route(
            "/users/{id}",
            put(handlers::user::update_user)
                .delete(handlers::user::delete_user)
                .route_layer(gate),
        );

    // 全局中间件，自外向内：请求追踪、CORS、请求体上限
    let global_layers = ServiceBuilder::new()
        .layer(axum::middleware::from_fn(
            crate::middleware::request_tracking_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    // 组合所有路由
    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(post_routes)
        .merge(comment_routes)
        .merge(user_routes)
        .layer(global_layers)
        .with_state(state)
}
