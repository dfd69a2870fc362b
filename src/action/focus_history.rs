use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of one autofocus run.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusRecord {
    pub position: i32,
    pub succeeded: bool,
    pub at: DateTime<Utc>,
}

/// Autofocus results keyed by (telescope, filter), shared across dispatches
/// so a recent solution can be reused instead of refocusing.
#[derive(Debug, Clone, Default)]
pub struct FocusHistory {
    records: Arc<Mutex<HashMap<(String, String), FocusRecord>>>,
}

impl FocusHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, telescope: &str, filter: &str, record: FocusRecord) {
        self.records
            .lock()
            .insert((telescope.to_string(), filter.to_string()), record);
    }

    pub fn latest(&self, telescope: &str, filter: &str) -> Option<FocusRecord> {
        self.records
            .lock()
            .get(&(telescope.to_string(), filter.to_string()))
            .cloned()
    }

    /// A successful autofocus for this pair no older than `max_age`.
    pub fn fresh(
        &self,
        telescope: &str,
        filter: &str,
        now: DateTime<Utc>,
        max_age: Duration,
    ) -> Option<FocusRecord> {
        let record = self.latest(telescope, filter)?;
        let age = now.signed_duration_since(record.at).to_std().ok()?;
        (record.succeeded && age <= max_age).then_some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn test_fresh_requires_success_and_age() {
        let history = FocusHistory::new();
        let now = Utc::now();
        history.record(
            "7DT01",
            "g",
            FocusRecord {
                position: 12000,
                succeeded: true,
                at: now - ChronoDuration::minutes(10),
            },
        );
        history.record(
            "7DT01",
            "r",
            FocusRecord {
                position: 0,
                succeeded: false,
                at: now,
            },
        );

        let max_age = Duration::from_secs(30 * 60);
        assert_eq!(
            history.fresh("7DT01", "g", now, max_age).map(|r| r.position),
            Some(12000)
        );
        assert!(history.fresh("7DT01", "g", now, Duration::from_secs(60)).is_none());
        assert!(history.fresh("7DT01", "r", now, max_age).is_none());
        assert!(history.fresh("7DT02", "g", now, max_age).is_none());
    }

    #[test]
    fn test_clones_share_records() {
        let history = FocusHistory::new();
        let shared = history.clone();
        shared.record(
            "7DT03",
            "i",
            FocusRecord {
                position: 1,
                succeeded: true,
                at: Utc::now(),
            },
        );
        assert!(history.latest("7DT03", "i").is_some());
    }
}
