use std::{env, path::PathBuf, str::FromStr, time::Duration};

use config::{Config as config_config, ConfigError, File as config_file, Source};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::logging;

const CONFIG_PATH: &str = "app.json";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
#[serde(default)]
pub struct App {
    pub watch: Watch,
    pub twse: Twse,
    pub signals: Signals,
    pub server: Server,
    pub log: Log,
}

const WATCH_INTERVAL_SECS: &str = "WATCH_INTERVAL_SECS";
const WATCH_REQUEST_TIMEOUT_SECS: &str = "WATCH_REQUEST_TIMEOUT_SECS";
const WATCH_FAULT_RATE: &str = "WATCH_FAULT_RATE";

/// 輪詢相關設定
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Watch {
    /// 每輪刷新的間隔秒數
    pub interval_secs: u64,
    /// 單次 HTTP 請求的逾時秒數
    pub request_timeout_secs: u64,
    /// 狀態模擬故障的機率，0 代表停用
    pub fault_rate: f64,
}

impl Default for Watch {
    fn default() -> Self {
        Watch {
            interval_secs: 5,
            request_timeout_secs: 10,
            fault_rate: 0.0,
        }
    }
}

impl Watch {
    /// 刷新間隔，最少一秒
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

const TWSE_BASE_URL: &str = "TWSE_BASE_URL";
const TWSE_RELAY: &str = "TWSE_RELAY";

/// 台灣證券交易所基本市況報導網站
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Twse {
    pub base_url: String,
    /// CORS 中繼站的前綴，空字串代表直接連線
    pub relay: String,
}

impl Default for Twse {
    fn default() -> Self {
        Twse {
            base_url: "https://mis.twse.com.tw".to_string(),
            relay: String::new(),
        }
    }
}

const SIGNALS_URL: &str = "SIGNALS_URL";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Signals {
    pub url: String,
}

impl Default for Signals {
    fn default() -> Self {
        Signals {
            url: "http://127.0.0.1:3000/api/signals".to_string(),
        }
    }
}

const SERVER_HOST: &str = "SERVER_HOST";
const SERVER_PORT: &str = "SERVER_PORT";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Server {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Server {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

const LOG_DIR: &str = "LOG_DIR";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Log {
    pub dir: String,
    pub max_size_mb: u64,
    pub max_age_days: i64,
}

impl Default for Log {
    fn default() -> Self {
        Log {
            dir: "log".to_string(),
            max_size_mb: 10,
            max_age_days: 7,
        }
    }
}

pub static SETTINGS: Lazy<App> = Lazy::new(|| {
    App::get().unwrap_or_else(|why| {
        // 這裡不能寫入檔案日誌，日誌本身也依賴設定值
        logging::error_console(format!(
            "I can't read the config context because {:?}",
            why
        ));
        App::default().override_with_env()
    })
});

impl App {
    fn get() -> Result<Self, ConfigError> {
        let config_path = config_path();
        if config_path.exists() {
            return Self::build(config_file::from(config_path)).map(Self::override_with_env);
        }

        Ok(App::default().override_with_env())
    }

    fn build<S>(source: S) -> Result<Self, ConfigError>
    where
        S: Source + Send + Sync + 'static,
    {
        let config: App = config_config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// 將來至於 env 的設定值覆蓋掉 json 上的設定值
    fn override_with_env(mut self) -> Self {
        self.watch.interval_secs = env_or(WATCH_INTERVAL_SECS, self.watch.interval_secs);
        self.watch.request_timeout_secs =
            env_or(WATCH_REQUEST_TIMEOUT_SECS, self.watch.request_timeout_secs);
        self.watch.fault_rate = env_or(WATCH_FAULT_RATE, self.watch.fault_rate);

        if let Ok(base_url) = env::var(TWSE_BASE_URL) {
            self.twse.base_url = base_url;
        }

        if let Ok(relay) = env::var(TWSE_RELAY) {
            self.twse.relay = relay;
        }

        if let Ok(url) = env::var(SIGNALS_URL) {
            self.signals.url = url;
        }

        if let Ok(host) = env::var(SERVER_HOST) {
            self.server.host = host;
        }

        self.server.port = env_or(SERVER_PORT, self.server.port);

        if let Ok(dir) = env::var(LOG_DIR) {
            self.log.dir = dir;
        }

        self
    }
}

/// 讀取 env 並轉型，不存在或格式錯誤時沿用原本的值
fn env_or<T: FromStr>(key: &str, current: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| T::from_str(v.trim()).ok())
        .unwrap_or(current)
}

/// 回傳設定檔的路徑
fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}
