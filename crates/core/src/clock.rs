//! Millisecond clock used to timestamp history entries.

use std::sync::atomic::{AtomicI64, Ordering};

/// Source of wall-clock milliseconds that never goes backwards.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock clamped to be monotonically non-decreasing.
///
/// If the system clock steps backwards, the last observed value is
/// returned until wall time catches up.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicI64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        let wall = chrono::Utc::now().timestamp_millis();
        let previous = self.last.fetch_max(wall, Ordering::SeqCst);
        previous.max(wall)
    }
}
