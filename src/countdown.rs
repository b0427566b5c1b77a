use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// Time left until the ceremony, floored to whole seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownState {
    pub days: u64,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

impl CountdownState {
    pub fn is_zero(&self) -> bool {
        *self == CountdownState::default()
    }

    fn from_seconds(total: i64) -> Self {
        let total = total.max(0);
        // each component is below its modulus, so the narrowing casts are exact
        CountdownState {
            days: (total / DAY) as u64,
            hours: ((total % DAY) / HOUR) as u8,
            minutes: ((total % HOUR) / MINUTE) as u8,
            seconds: (total % MINUTE) as u8,
        }
    }
}

/// A fixed target instant. Once it has passed the remaining time stays at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    target: DateTime<FixedOffset>,
}

impl Countdown {
    pub fn new(target: DateTime<FixedOffset>) -> Self {
        Countdown { target }
    }

    pub fn target(&self) -> DateTime<FixedOffset> {
        self.target
    }

    pub fn remaining_at(&self, now: DateTime<Utc>) -> CountdownState {
        let diff = self.target.with_timezone(&Utc) - now;
        // num_seconds truncates toward zero, which floors any positive duration
        CountdownState::from_seconds(diff.num_seconds())
    }

    pub fn remaining(&self) -> CountdownState {
        self.remaining_at(Utc::now())
    }

    pub fn is_over_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.target.with_timezone(&Utc)
    }
}
