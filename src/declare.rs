use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 追蹤中的商品
///
/// 同時是內部代號與證交所基本市況報導代碼的對照表，
/// `symbol` 為內部代號，`code` 為回應中 `c` 欄位的值，`channel` 為查詢參數 `ex_ch` 使用的頻道。
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Ticker {
    /// 發行量加權股價指數
    #[serde(rename = "^TWII")]
    Taiex,
    /// 元大台灣50
    #[serde(rename = "0050.TW")]
    Etf0050,
    /// 元大高股息
    #[serde(rename = "0056.TW")]
    Etf0056,
    /// 國泰永續高股息
    #[serde(rename = "00878.TW")]
    Etf00878,
    /// 富邦台50
    #[serde(rename = "006208.TW")]
    Etf006208,
}

impl Ticker {
    /// 作為累計跌點依據的大盤指數
    pub const BENCHMARK: Ticker = Ticker::Taiex;

    pub fn symbol(&self) -> &'static str {
        match self {
            Ticker::Taiex => "^TWII",
            Ticker::Etf0050 => "0050.TW",
            Ticker::Etf0056 => "0056.TW",
            Ticker::Etf00878 => "00878.TW",
            Ticker::Etf006208 => "006208.TW",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Ticker::Taiex => "t00",
            Ticker::Etf0050 => "0050",
            Ticker::Etf0056 => "0056",
            Ticker::Etf00878 => "00878",
            Ticker::Etf006208 => "006208",
        }
    }

    /// 例如 `tse_t00.tw`
    pub fn channel(&self) -> String {
        format!("tse_{}.tw", self.code())
    }

    pub fn from_code(code: &str) -> Option<Ticker> {
        Self::iterator().find(|t| t.code() == code.trim())
    }

    pub fn from_symbol(symbol: &str) -> Option<Ticker> {
        Self::iterator().find(|t| t.symbol() == symbol.trim())
    }

    pub fn is_benchmark(&self) -> bool {
        *self == Self::BENCHMARK
    }

    pub fn iterator() -> impl Iterator<Item = Self> {
        [
            Self::Taiex,
            Self::Etf0050,
            Self::Etf0056,
            Self::Etf00878,
            Self::Etf006208,
        ]
        .iter()
        .copied()
    }
}

/// 單一商品的即時報價
#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub price: f64,
    /// 漲跌
    pub change: f64,
    /// 漲跌幅(%)
    pub change_percent: f64,
}

impl Quote {
    /// 由成交價與昨收價計算漲跌與漲跌幅，昨收價不大於零時回傳 None
    pub fn from_prices(price: f64, previous_close: f64) -> Option<Quote> {
        if !price.is_finite() || !previous_close.is_finite() || previous_close <= 0.0 {
            return None;
        }

        let change = price - previous_close;

        Some(Quote {
            price,
            change,
            change_percent: change / previous_close * 100.0,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusState {
    Active,
    Inactive,
    Error,
}

/// 每輪重新計算的盤勢狀態
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub state: StatusState,
    pub checked_at: DateTime<Utc>,
    pub market_open: bool,
    pub cumulative_drop: f64,
}

/// 外部訊號端點提供的進場訊號
///
/// 每一筆都保留端點回傳的原始 JSON，欄位缺漏、為 `null` 或型別不同都照樣轉交，
/// 常用欄位（`id`、`indicator`、`value`、`title`、`description`、`applicableTo`）另有讀取方法。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct Signal(pub Value);

impl Signal {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title").and_then(Value::as_str)
    }

    /// 適用的商品代號，非字串的項目略過
    pub fn applicable_to(&self) -> Vec<&str> {
        self.get("applicableTo")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

impl From<Value> for Signal {
    fn from(value: Value) -> Self {
        Signal(value)
    }
}

/// 提供給前端的儀表板快照
///
/// `quotes`、`status`、`signals` 與 `updated_at` 只會在同一輪成功時一起更新，
/// `error` 則保留最近一次失敗的訊息，直到下一輪成功為止。
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub quotes: BTreeMap<Ticker, Quote>,
    pub status: Option<SessionStatus>,
    pub signals: Vec<Signal>,
    pub error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    /// 已套用的輪數
    pub cycle: u64,
}

impl Default for Dashboard {
    fn default() -> Self {
        Dashboard {
            quotes: Ticker::iterator().map(|t| (t, Quote::default())).collect(),
            status: None,
            signals: Vec::new(),
            error: None,
            updated_at: None,
            cycle: 0,
        }
    }
}
