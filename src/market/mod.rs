//! # 盤勢模組
//!
//! - **開收盤判斷 (`session`)**：依台北時間判斷目前是否為交易時段。
//! - **報價存放 (`store`)**：五檔追蹤商品的報價與大盤累計跌點。
//! - **狀態合成 (`status`)**：結合交易時段與累計跌點產生每輪的狀態。

/// 交易時段判斷
pub mod session;
/// 盤勢狀態合成與故障模擬
pub mod status;
/// 報價存放
pub mod store;
