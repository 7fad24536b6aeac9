//! A clock driven by the test.

use std::sync::Mutex;

use chrono::{DateTime, TimeDelta, Utc};
use provenance::Clock;
use provenance_core::event::from_unix_micros;

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Start at the given Unix time in microseconds.
    ///
    /// # Panics
    ///
    /// If `micros` is outside chrono's range.
    pub fn at_micros(micros: i64) -> Self {
        let now = from_unix_micros(micros).expect("timestamp in range");
        Self {
            now: Mutex::new(now),
        }
    }

    /// Jump to an absolute time, forwards or backwards.
    pub fn set_micros(&self, micros: i64) {
        *self.now.lock().unwrap() = from_unix_micros(micros).expect("timestamp in range");
    }

    /// Move forward by `micros`.
    pub fn advance_micros(&self, micros: i64) {
        let mut now = self.now.lock().unwrap();
        *now += TimeDelta::microseconds(micros);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
