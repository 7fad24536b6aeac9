//! Time source for event and session timestamps.

use chrono::{DateTime, Utc};

/// Supplies the current time to the kernel.
///
/// Injected so tests can pin timestamps.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
