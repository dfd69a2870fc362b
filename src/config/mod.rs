//! # Pilot Configuration System
//!
//! YAML-based configuration for the orchestration core with environment
//! overrides (`development`, `test`, `production` sections merged over the
//! base document).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pilot_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let loop_interval = manager.config().scheduler.loop_interval();
//! let min_moon = manager.config().scoring.min_moon_separation;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants::system;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring `pilot.yaml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PilotConfig {
    /// Nightly loop timing and shutdown behaviour
    pub scheduler: SchedulerConfig,

    /// Target scoring constraints and weights
    pub scoring: ScoringConfig,

    /// Autofocus policy of single-telescope observation sequences
    pub autofocus: AutofocusConfig,

    /// Spectroscopic mode definitions
    pub spectroscopy: SpectroscopyConfig,

    /// Resolved environment name (not read from the file)
    #[serde(skip)]
    pub environment: String,
}

impl PilotConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        self.scheduler.validate()?;
        self.scoring.validate()?;
        self.autofocus.validate()?;
        self.spectroscopy.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Poll interval while waiting for the observing window to open
    pub window_poll_interval_ms: u64,
    /// Sleep between iterations of the main loop
    pub loop_interval_ms: u64,
    /// Poll interval of drain waits
    pub drain_poll_interval_ms: u64,
    /// Pause between consecutive resumed dispatches
    pub resume_stagger_ms: u64,
    /// Mark pending ToO targets `retracted` when the scheduler is shut down
    pub retract_too_on_shutdown: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            window_poll_interval_ms: system::WINDOW_POLL_INTERVAL_MS,
            loop_interval_ms: system::LOOP_INTERVAL_MS,
            drain_poll_interval_ms: system::DRAIN_POLL_INTERVAL_MS,
            resume_stagger_ms: system::RESUME_STAGGER_MS,
            retract_too_on_shutdown: false,
        }
    }
}

impl SchedulerConfig {
    pub fn window_poll_interval(&self) -> Duration {
        Duration::from_millis(self.window_poll_interval_ms)
    }

    pub fn loop_interval(&self) -> Duration {
        Duration::from_millis(self.loop_interval_ms)
    }

    pub fn drain_poll_interval(&self) -> Duration {
        Duration::from_millis(self.drain_poll_interval_ms)
    }

    pub fn resume_stagger(&self) -> Duration {
        Duration::from_millis(self.resume_stagger_ms)
    }

    fn validate(&self) -> ConfigResult<()> {
        for (field, value) in [
            ("scheduler.window_poll_interval_ms", self.window_poll_interval_ms),
            ("scheduler.loop_interval_ms", self.loop_interval_ms),
            ("scheduler.drain_poll_interval_ms", self.drain_poll_interval_ms),
        ] {
            if value == 0 {
                return Err(ConfigurationError::out_of_range(
                    field,
                    value,
                    "polling intervals must be greater than zero",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Degrees
    pub min_altitude: f64,
    /// Degrees
    pub max_altitude: f64,
    /// Degrees
    pub min_moon_separation: f64,
    pub weight_altitude: f64,
    pub weight_priority: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_altitude: 10.0,
            max_altitude: 90.0,
            min_moon_separation: 40.0,
            weight_altitude: 0.5,
            weight_priority: 0.5,
        }
    }
}

impl ScoringConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !(-90.0..=90.0).contains(&self.min_altitude) || !(-90.0..=90.0).contains(&self.max_altitude) {
            return Err(ConfigurationError::out_of_range(
                "scoring.min_altitude/max_altitude",
                format!("[{}, {}]", self.min_altitude, self.max_altitude),
                "an altitude band within [-90, 90]",
            ));
        }
        if self.min_altitude > self.max_altitude {
            return Err(ConfigurationError::inconsistent(
                "scoring",
                format!(
                    "min_altitude {} exceeds max_altitude {}",
                    self.min_altitude, self.max_altitude
                ),
            ));
        }
        if self.min_moon_separation < 0.0 {
            return Err(ConfigurationError::out_of_range(
                "scoring.min_moon_separation",
                self.min_moon_separation,
                "must be non-negative",
            ));
        }
        if self.weight_altitude < 0.0 || self.weight_priority < 0.0 {
            return Err(ConfigurationError::out_of_range(
                "scoring.weight_altitude/weight_priority",
                format!("{}/{}", self.weight_altitude, self.weight_priority),
                "non-negative weights",
            ));
        }
        if self.weight_altitude + self.weight_priority <= 0.0 {
            return Err(ConfigurationError::inconsistent(
                "scoring",
                "weight_altitude and weight_priority must not both be zero",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AutofocusConfig {
    /// Reuse a recent successful autofocus for the same filter
    pub use_history: bool,
    pub history_duration_min: f64,
    pub before_start: bool,
    pub when_filter_change: bool,
    pub when_elapsed: bool,
    pub elapsed_duration_min: f64,
}

impl Default for AutofocusConfig {
    fn default() -> Self {
        Self {
            use_history: true,
            history_duration_min: 60.0,
            before_start: true,
            when_filter_change: true,
            when_elapsed: true,
            elapsed_duration_min: 60.0,
        }
    }
}

impl AutofocusConfig {
    /// Policy that never autofocuses.
    pub fn disabled() -> Self {
        Self {
            use_history: false,
            history_duration_min: 0.0,
            before_start: false,
            when_filter_change: false,
            when_elapsed: false,
            elapsed_duration_min: 0.0,
        }
    }

    pub fn history_duration(&self) -> Duration {
        minutes(self.history_duration_min)
    }

    pub fn elapsed_duration(&self) -> Duration {
        minutes(self.elapsed_duration_min)
    }

    fn validate(&self) -> ConfigResult<()> {
        for (field, minutes) in [
            ("autofocus.history_duration_min", self.history_duration_min),
            ("autofocus.elapsed_duration_min", self.elapsed_duration_min),
        ] {
            if !minutes.is_finite() || minutes < 0.0 {
                return Err(ConfigurationError::out_of_range(
                    field,
                    minutes,
                    "a finite, non-negative number of minutes",
                ));
            }
        }
        Ok(())
    }
}

/// Negative and NaN clamp to zero, overflow saturates.
fn minutes(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0) * 60.0).unwrap_or(Duration::MAX)
}

/// Spectroscopic mode table: mode name → telescope name → filters.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SpectroscopyConfig {
    pub modes: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl SpectroscopyConfig {
    pub fn filters_for(&self, specmode: &str, telescope: &str) -> Option<&[String]> {
        self.modes
            .get(specmode)
            .and_then(|mode| mode.get(telescope))
            .map(Vec::as_slice)
    }

    fn validate(&self) -> ConfigResult<()> {
        for (mode, telescopes) in &self.modes {
            if telescopes.is_empty() {
                return Err(ConfigurationError::out_of_range(
                    format!("spectroscopy.modes.{mode}"),
                    "{}",
                    "a spectroscopic mode must assign filters to at least one telescope",
                ));
            }
        }
        Ok(())
    }
}
