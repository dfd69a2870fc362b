//! Test data builders for targets, plans and scheduler setups.

#![allow(dead_code)]

use super::collaborators::{
    default_observability, FixedEphemeris, InMemoryTargetStore, ManualClock, SwitchableSafety,
};
use super::mock_telescope::{fleet, telescopes, MockTelescope};
use chrono::{Duration as ChronoDuration, Utc};
use pilot_core::config::{AutofocusConfig, PilotConfig};
use pilot_core::models::{ExposurePlan, ExposureStep, ObservationMode, Target};
use pilot_core::pool::ResourcePool;
use pilot_core::scheduler::{Collaborators, NightScheduler, ObservingWindow};
use pilot_core::{Coordinates, ObjectType, TargetStatus};
use std::sync::Arc;

/// Builder pattern for test targets
pub struct TargetBuilder {
    target: Target,
}

impl TargetBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            target: Target {
                id: id.to_string(),
                name: format!("field-{id}"),
                coordinates: Coordinates::RaDec {
                    ra: 150.0,
                    dec: -30.0,
                },
                exposure: ExposurePlan::new(vec![step("g", 1.0, 1)]),
                mode: ObservationMode::Single,
                object_type: ObjectType::Ordinary,
                priority: 10.0,
                observability: Some(default_observability()),
                status: TargetStatus::Unscheduled,
                note: None,
            },
        }
    }

    pub fn priority(mut self, priority: f64) -> Self {
        self.target.priority = priority;
        self
    }

    pub fn mode(mut self, mode: ObservationMode) -> Self {
        self.target.mode = mode;
        self
    }

    pub fn too(mut self) -> Self {
        self.target.object_type = ObjectType::TargetOfOpportunity;
        self
    }

    pub fn steps(mut self, steps: Vec<ExposureStep>) -> Self {
        self.target.exposure = ExposurePlan::new(steps);
        self
    }

    pub fn coordinates(mut self, coordinates: Coordinates) -> Self {
        self.target.coordinates = coordinates;
        self
    }

    pub fn stale(mut self) -> Self {
        self.target.observability = None;
        self
    }

    pub fn moon_separation(mut self, degrees: f64) -> Self {
        if let Some(observability) = self.target.observability.as_mut() {
            observability.moon_separation = degrees;
        }
        self
    }

    pub fn build(self) -> Target {
        self.target
    }
}

pub fn step(filter: &str, exptime: f64, count: u32) -> ExposureStep {
    ExposureStep {
        filter: filter.to_string(),
        exptime,
        count,
        binning: 1,
    }
}

/// Configuration with millisecond loop timing and no autofocus.
pub fn test_config() -> PilotConfig {
    let mut config = PilotConfig::default();
    config.scheduler.window_poll_interval_ms = 5;
    config.scheduler.loop_interval_ms = 5;
    config.scheduler.drain_poll_interval_ms = 5;
    config.scheduler.resume_stagger_ms = 1;
    config.autofocus = AutofocusConfig::disabled();
    config.environment = "test".to_string();
    config
}

/// A fleet of mock telescopes plus in-memory collaborators around one
/// night scheduler.
pub struct Observatory {
    pub mocks: Vec<Arc<MockTelescope>>,
    pub store: Arc<InMemoryTargetStore>,
    pub ephemeris: Arc<FixedEphemeris>,
    pub safety: Arc<SwitchableSafety>,
    pub clock: Arc<ManualClock>,
    pub window: ObservingWindow,
    pub scheduler: Arc<NightScheduler>,
}

impl Observatory {
    /// Window already open; the clock sits one minute past its start.
    pub fn new(fleet_size: usize, targets: Vec<Target>) -> Self {
        Self::with_config(fleet_size, targets, test_config())
    }

    pub fn with_config(fleet_size: usize, targets: Vec<Target>, config: PilotConfig) -> Self {
        let start = Utc::now();
        let window = ObservingWindow {
            start,
            end: start + ChronoDuration::hours(8),
        };
        let mocks = fleet(fleet_size);
        let store = Arc::new(InMemoryTargetStore::new(targets));
        let ephemeris = Arc::new(FixedEphemeris::new(window));
        let safety = Arc::new(SwitchableSafety::new(true));
        let clock = Arc::new(ManualClock::new(start + ChronoDuration::minutes(1)));

        let collaborators = Collaborators {
            store: store.clone(),
            ephemeris: ephemeris.clone(),
            safety: safety.clone(),
            clock: clock.clone(),
        };
        let pool = Arc::new(ResourcePool::new(telescopes(&mocks)));
        let scheduler = Arc::new(NightScheduler::new(config, pool, collaborators));

        Self {
            mocks,
            store,
            ephemeris,
            safety,
            clock,
            window,
            scheduler,
        }
    }

    pub fn mock(&self, name: &str) -> &Arc<MockTelescope> {
        self.mocks
            .iter()
            .find(|m| m.name() == name)
            .expect("unknown mock telescope")
    }

    /// Move the clock past the end of the window so `run` returns.
    pub fn close_window(&self) {
        self.clock.set(self.window.end + ChronoDuration::seconds(1));
    }
}
