use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use once_cell::sync::{Lazy, OnceCell};
use reqwest::{Client, Method, Response};

use crate::{config::SETTINGS, logging::Logger};

pub mod user_agent;

/// A singleton instance of the reqwest client.
static CLIENT: OnceCell<Client> = OnceCell::new();

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("http"));

/// Returns the reqwest client singleton instance or creates one if it doesn't exist.
///
/// 逾時取自 `watch.request_timeout_secs`，避免卡住的請求拖住整輪刷新。
fn get_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        // 已安裝過時會回傳 Err，直接忽略
        let _ = rustls::crypto::ring::default_provider().install_default();

        let timeout = SETTINGS.watch.request_timeout();

        Client::builder()
            // ===== 壓縮 =====
            .brotli(true)
            .gzip(true)
            .zstd(true)
            // ===== 超時設置 =====
            .connect_timeout(timeout.min(Duration::from_secs(8)))
            .timeout(timeout)
            // ===== TCP 優化 =====
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(60))
            // ===== 連接池 =====
            .pool_max_idle_per_host(8)
            .pool_idle_timeout(Duration::from_secs(90))
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(user_agent::gen_random_ua())
            .build()
            .map_err(|e| anyhow!("Failed to create reqwest client: {:?}", e))
    })
}

/// Performs an HTTP GET request and returns the raw response.
///
/// 不重試，失敗就交給下一輪輪詢；非 2xx 的狀態碼由呼叫端判斷。
pub async fn get_response(url: &str) -> Result<Response> {
    send(Method::GET, url).await
}

async fn send(method: Method, url: &str) -> Result<Response> {
    let visit_log = format!("{method}:{url}");
    let client = get_client()?;
    let rb = client.request(method, url);

    let start = Instant::now();
    let res = rb.send().await;
    let elapsed = start.elapsed().as_millis();

    match res {
        Ok(response) => {
            LOGGER.info(format!(
                "{} {} {} ms",
                visit_log,
                response.status(),
                elapsed
            ));
            Ok(response)
        }
        Err(why) => {
            LOGGER.error(format!("{} failed because {:?}. {} ms", visit_log, why, elapsed));
            Err(anyhow!("Failed to send request to {}: {:?}", url, why))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_response_returns_non_success_status() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let res = get_response(&format!("{}/missing", server.url()))
            .await
            .unwrap();

        assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_response_connection_refused() {
        // 綁定後立即釋放，取得一個沒有人在聽的埠
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        assert!(get_response(&format!("http://{}/", addr)).await.is_err());
    }
}
