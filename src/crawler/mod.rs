use async_trait::async_trait;
use thiserror::Error;

use crate::{declare::Signal, market::store::MarketState};

/// 外部訊號端點
pub mod signals;
/// 台灣證券交易所
pub mod twse;

/// 整批請求失敗的原因，單筆資料的錯誤不會出現在這裡
#[derive(Debug, Error)]
pub enum FetchError {
    /// 連線失敗、逾時或非 2xx 的狀態碼
    #[error("network error: {0}")]
    Network(String),
    /// 回應不是預期格式的 JSON
    #[error("parse error: {0}")]
    Parse(String),
}

/// 報價來源
#[async_trait]
pub trait QuoteFeed: Send + Sync {
    /// 取得最新報價並回傳套用後的暫存狀態，`state` 本身不會被修改
    async fn refresh_quotes(&self, state: &MarketState) -> Result<MarketState, FetchError>;
}

/// 進場訊號來源，任何錯誤都以空清單表示
#[async_trait]
pub trait SignalFeed: Send + Sync {
    async fn fetch_signals(&self) -> Vec<Signal>;
}
