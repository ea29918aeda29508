/// 定時刷新報價、盤勢狀態與進場訊號
pub mod refresh;
