use chrono::{DateTime, Utc};
use rand::Rng;

use crate::{
    declare::{SessionStatus, StatusState},
    market::session,
};

/// 模擬上游不穩定的故障注入策略
pub trait FaultPolicy: Send + Sync {
    /// 回傳 true 時，該輪狀態會被改為 ERROR
    fn inject(&self) -> bool;
}

/// 不注入故障
pub struct NoFault;

impl FaultPolicy for NoFault {
    fn inject(&self) -> bool {
        false
    }
}

/// 以固定機率注入故障
pub struct RandomFault {
    rate: f64,
}

impl RandomFault {
    /// `rate` 會被限制在 0 到 1 之間，非數值視為 0
    pub fn new(rate: f64) -> Self {
        let rate = if rate.is_finite() {
            rate.clamp(0.0, 1.0)
        } else {
            0.0
        };

        RandomFault { rate }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl FaultPolicy for RandomFault {
    fn inject(&self) -> bool {
        self.rate > 0.0 && rand::rng().random_bool(self.rate)
    }
}

/// 依設定的機率建立策略，機率不大於零時不注入
pub fn fault_policy(rate: f64) -> Box<dyn FaultPolicy> {
    let random = RandomFault::new(rate);
    if random.rate() > 0.0 {
        Box::new(random)
    } else {
        Box::new(NoFault)
    }
}

/// 合成當下的盤勢狀態，沒有失敗路徑，故障只會反映在 `state` 上
pub fn synthesize(
    now: DateTime<Utc>,
    cumulative_drop: f64,
    fault: &dyn FaultPolicy,
) -> SessionStatus {
    let market_open = session::is_market_open(&now);
    let state = if fault.inject() {
        StatusState::Error
    } else if market_open {
        StatusState::Active
    } else {
        StatusState::Inactive
    };

    SessionStatus {
        state,
        checked_at: now,
        market_open,
        cumulative_drop,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    struct AlwaysFault;

    impl FaultPolicy for AlwaysFault {
        fn inject(&self) -> bool {
            true
        }
    }

    /// 週一 10:00 台北
    fn trading_hours() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 2, 0, 0).unwrap()
    }

    /// 週日 10:00 台北
    fn weekend() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 2, 0, 0).unwrap()
    }

    #[test]
    fn test_active_when_open() {
        let status = synthesize(trading_hours(), -99.5, &NoFault);

        assert_eq!(status.state, StatusState::Active);
        assert!(status.market_open);
        assert_eq!(status.checked_at, trading_hours());
        assert_eq!(status.cumulative_drop, -99.5);
    }

    #[test]
    fn test_inactive_when_closed() {
        let status = synthesize(weekend(), 0.0, &NoFault);

        assert_eq!(status.state, StatusState::Inactive);
        assert!(!status.market_open);
    }

    #[test]
    fn test_fault_overrides_state_only() {
        let status = synthesize(trading_hours(), -12.0, &AlwaysFault);

        assert_eq!(status.state, StatusState::Error);
        assert!(status.market_open);
        assert_eq!(status.cumulative_drop, -12.0);
    }

    #[test]
    fn test_random_fault_rate_bounds() {
        assert_eq!(RandomFault::new(-1.0).rate(), 0.0);
        assert_eq!(RandomFault::new(2.0).rate(), 1.0);
        assert_eq!(RandomFault::new(f64::NAN).rate(), 0.0);
        assert!(RandomFault::new(1.0).inject());
        assert!(!RandomFault::new(0.0).inject());
        assert!(!fault_policy(0.0).inject());
        assert!(fault_policy(1.0).inject());
    }
}
