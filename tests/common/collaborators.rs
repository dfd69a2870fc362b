use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use pilot_core::models::{Observability, Target};
use pilot_core::scheduler::{Clock, Ephemeris, ObservingWindow, SafetyMonitor, TargetStore};
use pilot_core::{PilotError, Result, TargetStatus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Target table kept in memory, in insertion order, with a log of every
/// status transition written by the scheduler.
#[derive(Debug, Default)]
pub struct InMemoryTargetStore {
    targets: Mutex<Vec<Target>>,
    transitions: Mutex<Vec<(String, TargetStatus)>>,
    refreshed: AtomicUsize,
}

impl InMemoryTargetStore {
    pub fn new(targets: Vec<Target>) -> Self {
        Self {
            targets: Mutex::new(targets),
            ..Default::default()
        }
    }

    pub fn insert(&self, target: Target) {
        self.targets.lock().push(target);
    }

    pub fn status_of(&self, target_id: &str) -> Option<TargetStatus> {
        self.targets
            .lock()
            .iter()
            .find(|t| t.id == target_id)
            .map(|t| t.status)
    }

    /// Statuses written for one target, oldest first.
    pub fn transitions(&self, target_id: &str) -> Vec<TargetStatus> {
        self.transitions
            .lock()
            .iter()
            .filter(|(id, _)| id == target_id)
            .map(|(_, status)| *status)
            .collect()
    }

    pub fn refreshed(&self) -> usize {
        self.refreshed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TargetStore for InMemoryTargetStore {
    async fn pending_targets(&self) -> Result<Vec<Target>> {
        Ok(self
            .targets
            .lock()
            .iter()
            .filter(|t| t.status.is_pending())
            .cloned()
            .collect())
    }

    async fn update_status(&self, target_id: &str, status: TargetStatus) -> Result<()> {
        let mut targets = self.targets.lock();
        let Some(target) = targets.iter_mut().find(|t| t.id == target_id) else {
            return Err(PilotError::InvalidTarget {
                target_id: target_id.to_string(),
                reason: "unknown target".to_string(),
            });
        };
        target.status = status;
        self.transitions.lock().push((target_id.to_string(), status));
        Ok(())
    }

    async fn refresh_stale(&self, _now: DateTime<Utc>) -> Result<usize> {
        let mut refreshed = 0;
        for target in self.targets.lock().iter_mut().filter(|t| t.needs_refresh()) {
            target.observability = Some(default_observability());
            refreshed += 1;
        }
        self.refreshed.fetch_add(refreshed, Ordering::SeqCst);
        Ok(refreshed)
    }
}

pub fn default_observability() -> Observability {
    Observability {
        rise_time: None,
        transit_time: None,
        set_time: None,
        best_time: None,
        max_altitude: 80.0,
        moon_separation: 90.0,
    }
}

/// Altitudes per target id, settable mid-test; everything else uses the
/// default altitude.
#[derive(Debug)]
pub struct FixedEphemeris {
    default_altitude: Mutex<f64>,
    altitudes: Mutex<HashMap<String, f64>>,
    night: AtomicBool,
    window: ObservingWindow,
}

impl FixedEphemeris {
    pub fn new(window: ObservingWindow) -> Self {
        Self {
            default_altitude: Mutex::new(60.0),
            altitudes: Mutex::new(HashMap::new()),
            night: AtomicBool::new(true),
            window,
        }
    }

    pub fn set_altitude(&self, target_id: &str, altitude: f64) {
        self.altitudes.lock().insert(target_id.to_string(), altitude);
    }

    pub fn set_default_altitude(&self, altitude: f64) {
        *self.default_altitude.lock() = altitude;
    }

    pub fn set_night(&self, night: bool) {
        self.night.store(night, Ordering::SeqCst);
    }
}

impl Ephemeris for FixedEphemeris {
    fn altitude(&self, target: &Target, _at: DateTime<Utc>) -> f64 {
        self.altitudes
            .lock()
            .get(&target.id)
            .copied()
            .unwrap_or(*self.default_altitude.lock())
    }

    fn is_night(&self, _at: DateTime<Utc>) -> bool {
        self.night.load(Ordering::SeqCst)
    }

    fn observing_window(&self, _now: DateTime<Utc>) -> ObservingWindow {
        self.window
    }
}

#[derive(Debug)]
pub struct SwitchableSafety {
    safe: AtomicBool,
}

impl SwitchableSafety {
    pub fn new(safe: bool) -> Self {
        Self {
            safe: AtomicBool::new(safe),
        }
    }

    pub fn set_safe(&self, safe: bool) {
        self.safe.store(safe, Ordering::SeqCst);
    }
}

#[async_trait]
impl SafetyMonitor for SwitchableSafety {
    async fn is_safe(&self) -> bool {
        self.safe.load(Ordering::SeqCst)
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: ChronoDuration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
