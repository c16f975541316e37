//! Staleness policy shared by every cached resource

use chrono::{DateTime, Duration, Utc};

/// Default refresh window for the catalog
pub const DEFAULT_REFRESH_INTERVAL_SECS: i64 = 6 * 3600;

/// Lowest interval a configuration may ask for (prevents runaway refreshing)
pub const MIN_REFRESH_INTERVAL_SECS: i64 = 10 * 60;

/// When a stamped resource must be fetched again
///
/// Languages, each language's cards, and the catalog as a whole are stamped
/// separately but judged by the same interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    interval: Duration,
    floor: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::seconds(DEFAULT_REFRESH_INTERVAL_SECS),
            floor: Duration::seconds(MIN_REFRESH_INTERVAL_SECS),
        }
    }
}

impl RefreshPolicy {
    pub fn new(interval: Duration, floor: Duration) -> Self {
        Self { interval, floor }
    }

    pub fn from_secs(interval_secs: u64, floor_secs: u64) -> Self {
        let to_duration = |secs: u64| Duration::seconds(secs.min(i64::MAX as u64 / 1000) as i64);
        Self::new(to_duration(interval_secs), to_duration(floor_secs))
    }

    /// The configured interval, never below the floor
    pub fn effective_interval(&self) -> Duration {
        self.interval.max(self.floor)
    }

    /// A resource with no stamp is always stale
    pub fn is_stale(&self, stamp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match stamp {
            Some(stamp) => now.signed_duration_since(stamp) >= self.effective_interval(),
            None => true,
        }
    }

    /// Time left until the resource goes stale; zero once it has
    pub fn remaining(&self, stamp: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
        let left = self.effective_interval() - now.signed_duration_since(stamp);
        left.max(Duration::zero())
    }
}
