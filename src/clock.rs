//! Time source for token expiry.
//!
//! Session records are stamped and checked against a [`Clock`] rather than
//! `Utc::now()` directly, so a client sharing one clock with its tests can
//! watch a live session lapse.

use chrono::{DateTime, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock, shareable as `Arc<dyn Clock>`.
///
/// Time only moves when [`MockClock::advance`] is called, which works
/// through a shared reference so a test can keep a handle to the same clock
/// it gave the client.
#[cfg(any(test, feature = "test-seams"))]
#[derive(Debug)]
pub struct MockClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

#[cfg(any(test, feature = "test-seams"))]
impl MockClock {
    /// Clock stopped at an RFC 3339 instant.
    ///
    /// # Panics
    /// Panics if `s` is not valid RFC 3339.
    pub fn from_rfc3339(s: &str) -> Self {
        let now = DateTime::parse_from_rfc3339(s)
            .expect("valid RFC 3339")
            .with_timezone(&Utc);
        Self {
            now: std::sync::Mutex::new(now),
        }
    }

    /// Move the clock by `by`; negative durations rewind it.
    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }
}

#[cfg(any(test, feature = "test-seams"))]
impl Clock for MockClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn system_clock_is_past_epoch() {
        assert!(SystemClock.now_utc().timestamp() > 0);
    }

    #[test]
    fn mock_clock_moves_only_when_advanced() {
        let clock = MockClock::from_rfc3339("2025-01-15T12:00:00Z");
        let before = clock.now_utc();
        assert_eq!(clock.now_utc(), before);

        clock.advance(chrono::Duration::minutes(-30));
        assert_eq!(clock.now_utc().to_rfc3339(), "2025-01-15T11:30:00+00:00");
    }

    #[test]
    fn mock_clock_advances_through_shared_handle() {
        let clock = Arc::new(MockClock::from_rfc3339("2025-01-15T12:00:00Z"));
        let shared: Arc<dyn Clock> = clock.clone();

        clock.advance(chrono::Duration::hours(3));
        assert_eq!(shared.now_utc().to_rfc3339(), "2025-01-15T15:00:00+00:00");
    }
}
