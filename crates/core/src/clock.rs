//! Clock abstraction for testable time handling.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of the current Unix time, in whole seconds.
///
/// Every timestamp in the catalog and status registry is read through this
/// trait instead of calling `SystemTime::now()` directly, so tests can freeze
/// or advance time deterministically.
pub trait Clock: Send + Sync {
    fn epoch_s(&self) -> i64;
}

/// Real system clock.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_s(&self) -> i64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
    }
}

/// Fake clock for deterministic tests.
#[derive(Clone)]
pub struct FakeClock {
    current: Arc<Mutex<i64>>,
}

impl FakeClock {
    pub fn new(start_epoch_s: i64) -> Self {
        Self { current: Arc::new(Mutex::new(start_epoch_s)) }
    }

    pub fn advance_s(&self, secs: i64) {
        *self.current.lock() += secs;
    }

    pub fn set(&self, epoch_s: i64) {
        *self.current.lock() = epoch_s;
    }
}

impl Clock for FakeClock {
    fn epoch_s(&self) -> i64 {
        *self.current.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_advances() {
        let clock = FakeClock::new(1_000);
        assert_eq!(clock.epoch_s(), 1_000);
        clock.advance_s(30);
        assert_eq!(clock.epoch_s(), 1_030);
    }
}
