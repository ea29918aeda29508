use chrono::{DateTime, Datelike, TimeZone, Weekday};
use chrono_tz::{Asia::Taipei, Tz};

/// A trait representing the weekend concept.
pub trait Weekend {
    /// Returns `true` if the date is on a Saturday or Sunday.
    fn is_weekend(&self) -> bool;
}

impl<T: TimeZone> Weekend for DateTime<T> {
    fn is_weekend(&self) -> bool {
        matches!(self.weekday(), Weekday::Sat | Weekday::Sun)
    }
}

/// 轉換成台北時間
pub fn to_taipei<T: TimeZone>(date_time: &DateTime<T>) -> DateTime<Tz> {
    date_time.with_timezone(&Taipei)
}
