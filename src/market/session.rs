use chrono::{DateTime, TimeZone, Timelike};

use crate::util::datetime::{self, Weekend};

/// 09:00:00 開盤
const OPENING_SECONDS: u32 = 9 * 60 * 60;
/// 13:30:00 收盤，含收盤當下
const CLOSING_SECONDS: u32 = 13 * 60 * 60 + 30 * 60;

/// 判斷台股目前是否在交易時段內
///
/// 換算成台北時間後，週一至週五的 09:00:00 到 13:30:00（兩端皆含）視為開盤。
/// 以秒為單位比較，13:30:00 仍算開盤，13:30:01 已收盤。
pub fn is_market_open<T: TimeZone>(now: &DateTime<T>) -> bool {
    let local = datetime::to_taipei(now);
    if local.is_weekend() {
        return false;
    }

    (OPENING_SECONDS..=CLOSING_SECONDS).contains(&local.num_seconds_from_midnight())
}
