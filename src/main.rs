use std::path::Path;

use anyhow::Result;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

use arxiv_digest::config::{Config, DEFAULT_SECRETS_FILE, DEFAULT_SETTINGS_FILE};
use arxiv_digest::orchestrator::{App, DailyScheduler, LastRunStore};
use arxiv_digest::utils::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = match Config::load(
        Path::new(DEFAULT_SECRETS_FILE),
        Path::new(DEFAULT_SETTINGS_FILE),
    ) {
        Ok(config) => config,
        Err(e) => {
            error!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let once = std::env::args().skip(1).any(|arg| arg == "--once");
    let app = App::initialize(config)?;

    // 快速模式：立即运行一次
    if once {
        info!("⚡ 快速模式：立即运行一次");
        if let Err(e) = app.run_once().await {
            error!("❌ 运行失败: {}", e);
            std::process::exit(1);
        }
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let scheduler = DailyScheduler::new(app.config().daily_run_at, app.config().poll_interval)
        .with_store(LastRunStore::in_dir(&app.config().output_dir));

    let app = &app;
    scheduler
        .run(move || app.run_once(), shutdown_rx)
        .await;

    info!("👋 程序退出");
    Ok(())
}

/// 等待停止信号（Ctrl+C 或 SIGTERM）
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("无法监听 Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("无法监听 SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("收到 Ctrl+C，等待当前运行结束");
        },
        _ = terminate => {
            info!("收到 SIGTERM，等待当前运行结束");
        },
    }
}
