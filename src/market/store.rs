use std::collections::BTreeMap;

use serde::Serialize;

use crate::declare::{Quote, Ticker};

/// 追蹤商品的報價表
///
/// 建立時即包含全部五檔商品（預設全為零），之後只能透過 [`QuoteStore::replaced`]
/// 產生一份新的完整報價表，不提供就地修改。
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(transparent)]
pub struct QuoteStore {
    quotes: BTreeMap<Ticker, Quote>,
}

impl Default for QuoteStore {
    fn default() -> Self {
        QuoteStore {
            quotes: Ticker::iterator().map(|t| (t, Quote::default())).collect(),
        }
    }
}

impl QuoteStore {
    pub fn get(&self, ticker: Ticker) -> Quote {
        self.quotes.get(&ticker).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn to_map(&self) -> BTreeMap<Ticker, Quote> {
        self.quotes.clone()
    }

    /// 以目前的報價為底，套用 `updates` 後回傳新的報價表，未更新的商品保留原值
    pub fn replaced(&self, updates: &BTreeMap<Ticker, Quote>) -> Self {
        let mut quotes = self.quotes.clone();
        for (ticker, quote) in updates {
            quotes.insert(*ticker, *quote);
        }

        QuoteStore { quotes }
    }
}

/// 刷新流程唯一持有的盤勢資料：報價表與大盤累計跌點
///
/// 累計跌點保存的是最近一次取得的大盤漲跌，每次覆蓋而不是累加。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketState {
    quotes: QuoteStore,
    cumulative_drop: f64,
}

impl MarketState {
    pub fn quotes(&self) -> &QuoteStore {
        &self.quotes
    }

    pub fn cumulative_drop(&self) -> f64 {
        self.cumulative_drop
    }

    /// 產生套用這一輪報價後的暫存狀態，只有大盤在更新之列時才覆寫累計跌點
    pub fn staged(&self, updates: &BTreeMap<Ticker, Quote>) -> Self {
        let cumulative_drop = updates
            .get(&Ticker::BENCHMARK)
            .map(|q| q.change)
            .unwrap_or(self.cumulative_drop);

        MarketState {
            quotes: self.quotes.replaced(updates),
            cumulative_drop,
        }
    }
}
