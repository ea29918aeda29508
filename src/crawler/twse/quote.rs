use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    config::SETTINGS,
    crawler::{FetchError, QuoteFeed},
    declare::{Quote, Ticker},
    logging,
    market::store::MarketState,
    util::{http, text},
};

#[derive(Deserialize, Debug)]
struct StockInfoResponse {
    #[serde(rename = "msgArray", default)]
    msg_array: Option<Vec<Value>>,
}

/// `msgArray` 內的單筆資料，只取用需要的欄位
#[derive(Deserialize, Debug, Default)]
struct StockInfo {
    /// 代碼
    #[serde(default)]
    c: Option<String>,
    /// 最近成交價，尚未成交時為 `-`
    #[serde(default)]
    z: Option<String>,
    /// 昨收價
    #[serde(default)]
    y: Option<String>,
}

/// 證交所基本市況報導的即時報價
pub struct TwseQuote {
    base_url: String,
    /// CORS 中繼站的前綴，空字串代表直接連線
    relay: String,
}

impl TwseQuote {
    pub fn new(base_url: impl Into<String>, relay: impl Into<String>) -> Self {
        TwseQuote {
            base_url: base_url.into(),
            relay: relay.into(),
        }
    }

    pub fn from_settings() -> Self {
        Self::new(SETTINGS.twse.base_url.clone(), SETTINGS.twse.relay.clone())
    }

    /// 將所有追蹤商品合併成一次查詢，`timestamp` 用來避開快取
    fn request_url(&self, timestamp: i64) -> String {
        let channels = Ticker::iterator()
            .map(|t| t.channel())
            .collect::<Vec<_>>()
            .join("|");
        let upstream = format!(
            "{}/stock/api/getStockInfo.jsp?ex_ch={}&json=1&delay=0&_={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&channels),
            timestamp
        );

        if self.relay.is_empty() {
            return upstream;
        }

        format!("{}{}", self.relay, urlencoding::encode(&upstream))
    }
}

#[async_trait]
impl QuoteFeed for TwseQuote {
    async fn refresh_quotes(&self, state: &MarketState) -> Result<MarketState, FetchError> {
        let url = self.request_url(Utc::now().timestamp_millis());
        let response = http::get_response(&url)
            .await
            .map_err(|why| FetchError::Network(format!("{:?}", why)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Network(format!(
                "{} responded with {}",
                url, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|why| FetchError::Network(format!("Failed to read body because {:?}", why)))?;
        let payload = serde_json::from_str::<StockInfoResponse>(&body)
            .map_err(|why| FetchError::Parse(format!("{:?}", why)))?;

        match payload.msg_array {
            Some(records) if !records.is_empty() => Ok(stage(state, &records)),
            _ => {
                logging::warn_file_async(format!("msgArray is empty, keep the quotes. url:{}", url));
                Ok(state.clone())
            }
        }
    }
}

/// 計算本輪所有可用的報價並產生暫存狀態，無法使用的資料直接略過
fn stage(state: &MarketState, records: &[Value]) -> MarketState {
    let updates: BTreeMap<Ticker, Quote> = records.iter().filter_map(parse_record).collect();

    state.staged(&updates)
}

fn parse_record(record: &Value) -> Option<(Ticker, Quote)> {
    let info = match serde_json::from_value::<StockInfo>(record.clone()) {
        Ok(info) => info,
        Err(why) => {
            logging::debug_file_async(format!("Skip malformed record {} because {:?}", record, why));
            return None;
        }
    };

    let code = info.c.as_deref()?;
    let ticker = match Ticker::from_code(code) {
        Some(t) => t,
        None => {
            logging::debug_file_async(format!("Skip unknown code {}", code));
            return None;
        }
    };

    let price = text::parse_f64(info.z.as_deref()?, None).ok();
    let previous_close = text::parse_f64(info.y.as_deref()?, None).ok();
    let quote = price
        .zip(previous_close)
        .and_then(|(p, y)| Quote::from_prices(p, y));

    if quote.is_none() {
        logging::debug_file_async(format!(
            "Skip {} because z:{:?} y:{:?} is not usable",
            ticker.symbol(),
            info.z,
            info.y
        ));
    }

    quote.map(|q| (ticker, q))
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    const PATH: &str = "/stock/api/getStockInfo.jsp";

    fn assert_close(left: f64, right: f64) {
        assert!((left - right).abs() < 1e-3, "{} != {}", left, right);
    }

    #[test]
    fn test_stage_benchmark() {
        let records = vec![json!({"c": "t00", "z": "17000.5", "y": "17100.0"})];
        let state = stage(&MarketState::default(), &records);
        let taiex = state.quotes().get(Ticker::Taiex);

        assert_eq!(taiex.price, 17000.5);
        assert_close(taiex.change, -99.5);
        assert_close(taiex.change_percent, -0.582);
        assert_close(state.cumulative_drop(), -99.5);
        assert_eq!(state.quotes().len(), 5);
    }

    #[test]
    fn test_stage_skips_zero_previous_close_and_keeps_prior_value() {
        let prior = stage(
            &MarketState::default(),
            &[json!({"c": "0050", "z": "190.5", "y": "188.0"})],
        );
        let next = stage(
            &prior,
            &[
                json!({"c": "0050", "z": "191.0", "y": "0"}),
                json!({"c": "0056", "z": "36.1", "y": "36.0"}),
            ],
        );

        assert_eq!(next.quotes().get(Ticker::Etf0050), prior.quotes().get(Ticker::Etf0050));
        assert_eq!(next.quotes().get(Ticker::Etf0056).price, 36.1);
    }

    #[test]
    fn test_stage_skips_unusable_records() {
        let records = vec![
            json!({"c": "2330", "z": "1000", "y": "990"}),
            json!({"c": "00878", "z": "-", "y": "22.5"}),
            json!({"c": "006208", "z": "110", "y": "abc"}),
            json!({"c": 50, "z": "1", "y": "1"}),
            json!({"z": "1", "y": "1"}),
            json!("garbage"),
        ];
        let state = stage(&MarketState::default(), &records);

        assert_eq!(state, MarketState::default());
    }

    #[test]
    fn test_drop_untouched_without_benchmark() {
        let prior = stage(
            &MarketState::default(),
            &[json!({"c": "t00", "z": "17000", "y": "17100"})],
        );
        let next = stage(&prior, &[json!({"c": "0056", "z": "36.1", "y": "36.0"})]);

        assert_close(next.cumulative_drop(), -100.0);
    }

    #[test]
    fn test_request_url() {
        let direct = TwseQuote::new("https://mis.twse.com.tw/", "");
        let url = direct.request_url(1_700_000_000_000);

        assert_eq!(
            url,
            "https://mis.twse.com.tw/stock/api/getStockInfo.jsp?ex_ch=tse_t00.tw%7Ctse_0050.tw%7Ctse_0056.tw%7Ctse_00878.tw%7Ctse_006208.tw&json=1&delay=0&_=1700000000000"
        );

        let relayed = TwseQuote::new("https://mis.twse.com.tw", "https://relay.example/raw?url=");
        let relayed_url = relayed.request_url(1);

        assert!(relayed_url.starts_with("https://relay.example/raw?url=https%3A%2F%2Fmis.twse.com.tw"));
        assert!(!relayed_url["https://relay.example/raw?url=".len()..].contains('&'));
    }

    #[tokio::test]
    async fn test_refresh_quotes() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", PATH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded(
                    "ex_ch".into(),
                    "tse_t00.tw|tse_0050.tw|tse_0056.tw|tse_00878.tw|tse_006208.tw".into(),
                ),
                Matcher::Regex("_=\\d+".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "msgArray": [
                        {"c": "t00", "z": "17000.5", "y": "17100.0"},
                        {"c": "0050", "z": "190.5", "y": "188.0"}
                    ],
                    "rtcode": "0000"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let feed = TwseQuote::new(server.url(), "");
        let state = feed.refresh_quotes(&MarketState::default()).await.unwrap();

        mock.assert_async().await;
        assert_close(state.cumulative_drop(), -99.5);
        assert_eq!(state.quotes().get(Ticker::Etf0050).price, 190.5);
        assert_eq!(state.quotes().get(Ticker::Etf0056).price, 0.0);
    }

    #[tokio::test]
    async fn test_refresh_quotes_through_relay() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/raw")
            .match_query(Matcher::Regex("url=http".into()))
            .with_status(200)
            .with_body(r#"{"msgArray":[{"c":"0056","z":"36.1","y":"36.0"}]}"#)
            .create_async()
            .await;

        let feed = TwseQuote::new("https://mis.twse.com.tw", format!("{}/raw?url=", server.url()));
        let state = feed.refresh_quotes(&MarketState::default()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(state.quotes().get(Ticker::Etf0056).price, 36.1);
    }

    #[tokio::test]
    async fn test_refresh_quotes_empty_msg_array_is_noop() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"msgArray":[],"rtcode":"0000"}"#)
            .create_async()
            .await;

        let prior = stage(
            &MarketState::default(),
            &[json!({"c": "t00", "z": "17000", "y": "17100"})],
        );
        let feed = TwseQuote::new(server.url(), "");

        assert_eq!(feed.refresh_quotes(&prior).await.unwrap(), prior);
    }

    #[tokio::test]
    async fn test_refresh_quotes_missing_msg_array_is_noop() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"rtcode":"5000","rtmessage":"busy"}"#)
            .create_async()
            .await;

        let feed = TwseQuote::new(server.url(), "");

        assert_eq!(
            feed.refresh_quotes(&MarketState::default()).await.unwrap(),
            MarketState::default()
        );
    }

    #[tokio::test]
    async fn test_refresh_quotes_non_success_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body(r#"{"msgArray":[{"c":"t00","z":"1","y":"2"}]}"#)
            .create_async()
            .await;

        let feed = TwseQuote::new(server.url(), "");
        let result = feed.refresh_quotes(&MarketState::default()).await;

        assert!(matches!(result, Err(FetchError::Network(_))), "{:?}", result);
    }

    #[tokio::test]
    async fn test_refresh_quotes_malformed_json() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>blocked</html>")
            .create_async()
            .await;

        let feed = TwseQuote::new(server.url(), "");
        let result = feed.refresh_quotes(&MarketState::default()).await;

        assert!(matches!(result, Err(FetchError::Parse(_))), "{:?}", result);
    }
}
