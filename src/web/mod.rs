//! 提供前端讀取的儀表板快照
//!
//! - `GET /api/dashboard`：最近一次的快照（報價、盤勢狀態、進場訊號與錯誤訊息）
//! - `GET /health`：存活檢查

use std::{future::Future, sync::Arc};

use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use tokio::{net::TcpListener, sync::watch};

use crate::{config::SETTINGS, declare::Dashboard, logging};

type Snapshot = watch::Receiver<Arc<Dashboard>>;

pub fn router(snapshot: Snapshot) -> Router {
    Router::new()
        .route("/api/dashboard", get(dashboard))
        .route("/health", get(health))
        .with_state(snapshot)
}

async fn dashboard(State(snapshot): State<Snapshot>) -> Json<Dashboard> {
    let current = snapshot.borrow().clone();
    Json((*current).clone())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// 啟動 HTTP 服務，直到 `shutdown` 完成為止
pub async fn serve<F>(snapshot: Snapshot, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SETTINGS.server.addr();
    let listener = TcpListener::bind(&addr).await?;
    logging::info_file_async(format!("Dashboard listening on {}", addr));

    axum::serve(listener, router(snapshot))
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
