//! Narrow contracts of the systems the scheduler consumes but does not own.

use crate::constants::TargetStatus;
use crate::error::Result;
use crate::models::Target;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Nightly observing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservingWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ObservingWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

/// Persistent target table.
///
/// The scheduler only reads targets and writes status transitions.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Every target still awaiting observation, in insertion order, with
    /// whatever observability facts are known.
    async fn pending_targets(&self) -> Result<Vec<Target>>;

    async fn update_status(&self, target_id: &str, status: TargetStatus) -> Result<()>;

    /// Recompute observability for targets missing it. Returns how many were
    /// refreshed.
    async fn refresh_stale(&self, now: DateTime<Utc>) -> Result<usize>;
}

/// Astronomical facts at an instant.
pub trait Ephemeris: Send + Sync {
    /// Altitude of the target in degrees.
    fn altitude(&self, target: &Target, at: DateTime<Utc>) -> f64;

    fn is_night(&self, at: DateTime<Utc>) -> bool;

    /// The observing window of the night containing, or following, `now`.
    fn observing_window(&self, now: DateTime<Utc>) -> ObservingWindow;
}

/// Weather / enclosure safety, polled.
#[async_trait]
pub trait SafetyMonitor: Send + Sync {
    async fn is_safe(&self) -> bool;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_window_is_half_open() {
        let start = Utc::now();
        let window = ObservingWindow {
            start,
            end: start + Duration::hours(8),
        };
        assert!(window.contains(start));
        assert!(window.contains(start + Duration::hours(4)));
        assert!(!window.contains(start + Duration::hours(8)));
        assert!(!window.contains(start - Duration::seconds(1)));
    }
}
