use super::ExposurePlan;
use crate::constants::{ObjectType, TargetStatus};
use crate::error::{PilotError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Where to point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "frame", rename_all = "snake_case")]
pub enum Coordinates {
    RaDec { ra: f64, dec: f64 },
    AltAz { alt: f64, az: f64 },
    /// Keep the current pointing (calibration frames, tests).
    Fixed,
}

/// How a target uses the fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ObservationMode {
    /// One telescope, any one.
    Single,
    /// One-of-N search tile: one telescope, any one.
    Search,
    /// N telescopes co-adding the same plan.
    Deep { ntelescope: usize },
    /// Every telescope of the fleet, each with its spectroscopic filter set.
    Spec { specmode: String },
}

impl ObservationMode {
    pub fn kind(&self) -> ModeKind {
        match self {
            Self::Single => ModeKind::Single,
            Self::Search => ModeKind::Search,
            Self::Deep { .. } => ModeKind::Deep,
            Self::Spec { .. } => ModeKind::Spec,
        }
    }
}

/// Discriminant of [`ObservationMode`], used as the dispatch-table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    Single,
    Search,
    Deep,
    Spec,
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Search => write!(f, "search"),
            Self::Deep => write!(f, "deep"),
            Self::Spec => write!(f, "spec"),
        }
    }
}

/// Precomputed astronomical facts for one target, filled by the store's
/// stale-refresh pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observability {
    pub rise_time: Option<DateTime<Utc>>,
    pub transit_time: Option<DateTime<Utc>>,
    pub set_time: Option<DateTime<Utc>>,
    pub best_time: Option<DateTime<Utc>>,
    /// Highest altitude reached tonight, degrees
    pub max_altitude: f64,
    /// Angular distance to the moon, degrees
    pub moon_separation: f64,
}

/// Observation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub name: String,
    pub coordinates: Coordinates,
    pub exposure: ExposurePlan,
    pub mode: ObservationMode,
    #[serde(default)]
    pub object_type: ObjectType,
    pub priority: f64,
    #[serde(default)]
    pub observability: Option<Observability>,
    #[serde(default)]
    pub status: TargetStatus,
    #[serde(default)]
    pub note: Option<String>,
}

impl Target {
    pub fn is_too(&self) -> bool {
        self.object_type.is_too()
    }

    pub fn total_exposure(&self) -> Result<Duration> {
        self.exposure
            .total_duration()
            .map_err(|reason| PilotError::InvalidTarget {
                target_id: self.id.clone(),
                reason,
            })
    }

    pub fn needs_refresh(&self) -> bool {
        self.observability.is_none()
    }
}
