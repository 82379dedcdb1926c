//! Expiry rules shared by the credential slots.

use chrono::{DateTime, Local, TimeDelta};

/// Source of wall-clock time for the cache.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// The local system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// How long a cached credential stays usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryPolicy {
    /// Fetched once, kept for the lifetime of the process.
    Never,
    /// Valid while the local calendar date is unchanged.
    CalendarDay,
    /// Valid for a fixed duration after the fetch.
    Ttl(TimeDelta),
}

impl ExpiryPolicy {
    pub fn is_fresh(&self, fetched_at: &DateTime<Local>, now: &DateTime<Local>) -> bool {
        match self {
            Self::Never => true,
            Self::CalendarDay => fetched_at.date_naive() == now.date_naive(),
            Self::Ttl(ttl) => now.signed_duration_since(*fetched_at) < *ttl,
        }
    }
}
