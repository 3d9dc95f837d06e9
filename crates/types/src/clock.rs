use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Microseconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    pub const fn as_secs(&self) -> u64 {
        self.0 / 1_000_000
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}

/// Source of transaction time for registrations and mints.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

fn system_time_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_micros() as u64
}

/// Wall clock that never goes backwards.
///
/// If the system time stalls or steps back, the last emitted value is
/// advanced by one microsecond instead, so every reading is strictly greater
/// than the previous one.
#[derive(Debug, Default)]
pub struct SystemClock {
    last_us: Mutex<u64>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let mut last = self.last_us.lock();
        let mut candidate = system_time_us();
        if candidate <= *last {
            candidate = last.saturating_add(1);
        }
        *last = candidate;
        Timestamp(candidate)
    }
}

/// Manually driven clock for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_us: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now_us: AtomicU64::new(start.0),
        }
    }

    pub fn set(&self, at: Timestamp) {
        self.now_us.store(at.0, Ordering::SeqCst);
    }

    pub fn advance(&self, micros: u64) {
        self.now_us.fetch_add(micros, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.now_us.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_strictly_increasing() {
        let clock = SystemClock::new();
        let mut previous = clock.now();
        for _ in 0..1_000 {
            let next = clock.now();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn manual_clock_follows_instructions() {
        let clock = ManualClock::new(Timestamp::from_micros(10));
        assert_eq!(clock.now(), Timestamp(10));
        clock.advance(5);
        assert_eq!(clock.now(), Timestamp(15));
        clock.set(Timestamp(3_000_000));
        assert_eq!(clock.now().as_secs(), 3);
    }
}
