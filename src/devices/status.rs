use serde::{Deserialize, Serialize};
use std::fmt;

/// Device subsystems an action may depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subsystem {
    Mount,
    Camera,
    FilterWheel,
    Focuser,
}

impl Subsystem {
    pub const ALL: [Subsystem; 4] = [
        Subsystem::Mount,
        Subsystem::Camera,
        Subsystem::FilterWheel,
        Subsystem::Focuser,
    ];
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mount => write!(f, "mount"),
            Self::Camera => write!(f, "camera"),
            Self::FilterWheel => write!(f, "filterwheel"),
            Self::Focuser => write!(f, "focuser"),
        }
    }
}

/// Reported state of one subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubsystemStatus {
    Disconnected,
    Idle,
    Busy,
    Parked,
    /// Anything the device layer reported that is not one of the above.
    Unknown,
}

impl SubsystemStatus {
    pub fn is_connected(&self) -> bool {
        !matches!(self, Self::Disconnected)
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy)
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl fmt::Display for SubsystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Idle => write!(f, "idle"),
            Self::Busy => write!(f, "busy"),
            Self::Parked => write!(f, "parked"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Parse a driver status string. Unrecognised values map to `Unknown`
/// instead of failing.
impl From<&str> for SubsystemStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "disconnected" => Self::Disconnected,
            "idle" => Self::Idle,
            "busy" => Self::Busy,
            "parked" => Self::Parked,
            _ => Self::Unknown,
        }
    }
}
