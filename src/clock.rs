//! The injected time source.

use time::OffsetDateTime;

/// A source of wall-clock time, injected so the state machine's deadline
/// logic can be driven deterministically in tests.
///
/// `None` is the `indefinite` sentinel: callers encountering it are
/// expected to fail safe (force a refresh, force a timeout).
pub trait Clock: std::fmt::Debug + Send + Sync {
    /// Current time, in whole seconds since the Unix epoch, or `None` if
    /// the time source is unavailable.
    fn now(&self) -> Option<u64>;
}

/// A [`Clock`] backed by the system's real-time clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Option<u64> {
        let now = OffsetDateTime::now_utc();
        u64::try_from(now.unix_timestamp()).ok()
    }
}
