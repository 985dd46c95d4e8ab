//! 留言板服务主入口

use board_service::{
    config::AppConfig,
    db::Backend,
    handlers::health,
    middleware::AppState,
    routes, telemetry,
};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ===== CLI 参数处理 =====
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "--version" => {
                println!("board-service {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("未知参数: {}", args[1]);
                print_help();
                std::process::exit(1);
            }
        }
    }

    // 加载 .env 文件（开发环境）
    // 生产环境应该直接设置环境变量，不依赖 .env 文件
    if let Ok(env) = std::env::var("BOARD_ENV") {
        dotenv::from_filename(format!(".env.{}", env)).ok();
    } else {
        dotenv::from_filename(".env.local").ok();
        dotenv::dotenv().ok();
    }

    health::set_start_time();

    // 1. 加载配置
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        anyhow::anyhow!("Failed to load configuration: {}", e)
    })?;

    // 2. 初始化日志
    telemetry::init_telemetry(&config.logging)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Board service starting...");

    // 3. 存储：memory:// 使用进程内存储，否则连接 PostgreSQL 并执行迁移
    let backend = Backend::open(&config.database).await?;
    let stores = backend.stores();

    // 4. 构建应用状态与路由
    let addr = config.server.addr();
    let shutdown_timeout = config.server.graceful_shutdown_timeout_secs;
    let app_state = Arc::new(AppState::new(config, stores.users, stores.posts, stores.comments)?);
    let app = routes::create_router(app_state);

    // 5. 启动服务器
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    // 6. 优雅关闭
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_timeout))
        .await?;

    backend.close().await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// 优雅关闭信号处理
///
/// Returns once a signal arrives. In-flight requests then get `timeout_secs` to
/// finish before the process exits anyway.
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Terminate signal received, starting graceful shutdown");
        },
    }

    // 超时后强制退出
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(timeout_secs)).await;
        tracing::warn!("Graceful shutdown timeout reached, forcing exit");
        std::process::exit(1);
    });
}

/// 打印帮助信息
fn print_help() {
    println!("board-service {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("用法: board-service [选项]");
    println!();
    println!("选项:");
    println!("  --version     打印版本信息并退出");
    println!("  --help        打印此帮助信息并退出");
    println!();
    println!("环境变量 (前缀 BOARD_，层级分隔符 __):");
    println!("  BOARD_DATABASE__URL                    postgres://... 或 memory://");
    println!("  BOARD_SECURITY__ACCESS_TOKEN_SECRET    访问令牌密钥 (>= 32 字符)");
    println!("  BOARD_SECURITY__REFRESH_TOKEN_SECRET   刷新令牌密钥 (>= 32 字符)");
    println!("  BOARD_SECURITY__ACCESS_TOKEN_EXP_SECS  访问令牌有效期 (默认 3600)");
    println!("  BOARD_SERVER__PORT                     监听端口 (默认 3000)");
}
