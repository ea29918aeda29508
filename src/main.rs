#[cfg(all(target_os = "linux", target_env = "musl"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::env;

use anyhow::Result;

pub mod config;
pub mod crawler;
pub mod declare;
pub mod event;
pub mod logging;
pub mod market;
pub mod util;
pub mod web;

use crate::{config::SETTINGS, event::refresh};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let handle = refresh::spawn(
        refresh::Refresher::from_settings(),
        SETTINGS.watch.interval(),
    );

    let msg = format!(
        "StockWatch 已啟動 Rust OS/Arch: {}/{} 每 {:?} 刷新一次，儀表板 http://{}/api/dashboard",
        env::consts::OS,
        env::consts::ARCH,
        SETTINGS.watch.interval(),
        SETTINGS.server.addr()
    );
    logging::info_console(msg.clone());
    logging::info_file_async(msg);

    let served = web::serve(handle.subscribe(), shutdown_signal()).await;
    if let Err(why) = &served {
        logging::error_console(format!("Dashboard server stopped because {:?}", why));
        logging::error_file_async(format!("Dashboard server stopped because {:?}", why));
    }

    handle.shutdown().await;
    logging::info_console("StockWatch 已停止".to_string());

    served
}

/// 等待 Ctrl+C 或 SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(why) = tokio::signal::ctrl_c().await {
            logging::error_file_async(format!("Failed to listen for Ctrl+C because {:?}", why));
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(why) => {
                logging::error_file_async(format!("Failed to listen for SIGTERM because {:?}", why));
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
