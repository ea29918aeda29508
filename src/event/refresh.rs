use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::{
    sync::{oneshot, watch},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::{
    config::SETTINGS,
    crawler::{signals::SignalsEndpoint, twse::quote::TwseQuote, FetchError, QuoteFeed, SignalFeed},
    declare::Dashboard,
    logging,
    market::{
        status::{self, FaultPolicy},
        store::MarketState,
    },
};

/// 刷新失敗時顯示給使用者的訊息，畫面上保留上一次的資料
pub const REFRESH_FAILED: &str = "Failed to refresh market data, showing last known values";

/// 刷新流程，唯一持有並寫入 [`MarketState`] 的地方
///
/// 每一輪中，報價刷新與狀態合成依序執行（狀態讀取的是同一輪剛算出的累計跌點），
/// 並與訊號抓取同時進行。報價失敗時整輪不套用，快照只會多一個錯誤訊息。
pub struct Refresher {
    quote_feed: Arc<dyn QuoteFeed>,
    signal_feed: Arc<dyn SignalFeed>,
    fault: Box<dyn FaultPolicy>,
    state: MarketState,
    publisher: watch::Sender<Arc<Dashboard>>,
}

impl Refresher {
    pub fn new(
        quote_feed: Arc<dyn QuoteFeed>,
        signal_feed: Arc<dyn SignalFeed>,
        fault: Box<dyn FaultPolicy>,
    ) -> Self {
        let (publisher, _) = watch::channel(Arc::new(Dashboard::default()));

        Refresher {
            quote_feed,
            signal_feed,
            fault,
            state: MarketState::default(),
            publisher,
        }
    }

    pub fn from_settings() -> Self {
        Self::new(
            Arc::new(TwseQuote::from_settings()),
            Arc::new(SignalsEndpoint::from_settings()),
            status::fault_policy(SETTINGS.watch.fault_rate),
        )
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Dashboard>> {
        self.publisher.subscribe()
    }

    pub fn state(&self) -> &MarketState {
        &self.state
    }

    /// 執行一輪刷新
    pub async fn run_cycle(&mut self) -> Result<(), FetchError> {
        let quote_feed = Arc::clone(&self.quote_feed);
        let signal_feed = Arc::clone(&self.signal_feed);
        let fault = self.fault.as_ref();
        let state = &self.state;

        let quote_stage = async move {
            let staged = quote_feed.refresh_quotes(state).await?;
            let status = status::synthesize(Utc::now(), staged.cumulative_drop(), fault);
            Ok::<_, FetchError>((staged, status))
        };
        let (quoted, signals) = tokio::join!(quote_stage, signal_feed.fetch_signals());

        match quoted {
            Ok((staged, status)) => {
                self.state = staged;
                let cycle = self.publisher.borrow().cycle + 1;

                self.publisher.send_replace(Arc::new(Dashboard {
                    quotes: self.state.quotes().to_map(),
                    status: Some(status),
                    signals,
                    error: None,
                    updated_at: Some(Utc::now()),
                    cycle,
                }));

                Ok(())
            }
            Err(why) => {
                logging::error_file_async(format!("Failed to refresh quotes because {:?}", why));

                let mut current = (**self.publisher.borrow()).clone();
                current.error = Some(REFRESH_FAILED.to_string());
                self.publisher.send_replace(Arc::new(current));

                Err(why)
            }
        }
    }
}

/// 背景刷新工作的控制代碼，drop 時同樣會停止排程
pub struct RefreshHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    receiver: watch::Receiver<Arc<Dashboard>>,
}

impl RefreshHandle {
    pub fn subscribe(&self) -> watch::Receiver<Arc<Dashboard>> {
        self.receiver.clone()
    }

    /// 停止排程並等待進行中的那一輪結束
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            if let Err(why) = task.await {
                logging::error_file_async(format!("Refresh task ended abnormally: {:?}", why));
            }
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// 立即執行第一輪，之後每隔 `period` 執行一次；前一輪未完成前不會開始下一輪
pub fn spawn(refresher: Refresher, period: Duration) -> RefreshHandle {
    let (tx, rx) = oneshot::channel();
    let receiver = refresher.subscribe();
    let task = tokio::spawn(run(refresher, period, rx));

    RefreshHandle {
        shutdown: Some(tx),
        task: Some(task),
        receiver,
    }
}

async fn run(mut refresher: Refresher, period: Duration, mut shutdown: oneshot::Receiver<()>) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = interval.tick() => {
                if refresher.run_cycle().await.is_ok() {
                    logging::debug_file_async(format!(
                        "Refreshed, drop:{}",
                        refresher.state().cumulative_drop()
                    ));
                }
            }
        }
    }

    logging::info_file_async("Refresh loop stopped".to_string());
}
