use async_trait::async_trait;

use crate::{
    config::SETTINGS,
    crawler::SignalFeed,
    declare::Signal,
    logging,
    util::http,
};

/// 取得預先計算好的進場訊號，端點本身不屬於這個服務
pub struct SignalsEndpoint {
    url: String,
}

impl SignalsEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        SignalsEndpoint { url: url.into() }
    }

    pub fn from_settings() -> Self {
        Self::new(SETTINGS.signals.url.clone())
    }

    async fn visit(&self) -> anyhow::Result<Vec<Signal>> {
        let response = http::get_response(&self.url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("{} responded with {}", self.url, status));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }

        Ok(serde_json::from_str::<Option<Vec<Signal>>>(&body)?.unwrap_or_default())
    }
}

#[async_trait]
impl SignalFeed for SignalsEndpoint {
    async fn fetch_signals(&self) -> Vec<Signal> {
        match self.visit().await {
            Ok(signals) => signals,
            Err(why) => {
                logging::error_file_async(format!("Failed to fetch signals because {:?}", why));
                Vec::new()
            }
        }
    }
}
