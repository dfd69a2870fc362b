//! # Device Status Facade
//!
//! Narrow contract the orchestration core consumes from the per-telescope
//! device layer. Drivers, wire protocols and the mechanics of slewing or
//! exposing live behind [`DeviceFacade`]; the core only asks for subsystem
//! status, issues [`DeviceCommand`]s and requests hardware aborts.

mod status;
mod telescope;

pub use status::{Subsystem, SubsystemStatus};
pub use telescope::{Telescope, TelescopeStatus};

use crate::error::DeviceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single hardware operation understood by a device facade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DeviceCommand {
    SlewRaDec { ra: f64, dec: f64 },
    SlewAltAz { alt: f64, az: f64 },
    Expose {
        exptime: f64,
        filter: String,
        binning: u32,
        gain: u32,
        frame_number: u32,
    },
    MoveFilter { filter: String },
    /// Relative focuser move in steps.
    MoveFocuserBy { offset: i32 },
    /// Absolute focuser move.
    MoveFocuserTo { position: i32 },
    Autofocus { filter: String },
}

impl DeviceCommand {
    /// The subsystem the command drives.
    pub fn subsystem(&self) -> Subsystem {
        match self {
            Self::SlewRaDec { .. } | Self::SlewAltAz { .. } => Subsystem::Mount,
            Self::Expose { .. } => Subsystem::Camera,
            Self::MoveFilter { .. } => Subsystem::FilterWheel,
            Self::MoveFocuserBy { .. } | Self::MoveFocuserTo { .. } | Self::Autofocus { .. } => {
                Subsystem::Focuser
            }
        }
    }
}

/// Reply of a completed device command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceReply {
    Done,
    Frame { path: String },
    FocusPosition { position: i32 },
}

/// Per-telescope capability set consumed by actions.
///
/// `run` may suspend for the full duration of the hardware operation.
/// `abort` must be idempotent.
#[async_trait]
pub trait DeviceFacade: Send + Sync + std::fmt::Debug {
    async fn status(&self, subsystem: Subsystem) -> SubsystemStatus;

    async fn run(&self, command: DeviceCommand) -> Result<DeviceReply, DeviceError>;

    async fn abort(&self, subsystem: Subsystem);

    /// Filter currently in the light path.
    async fn current_filter(&self) -> Result<String, DeviceError>;

    /// Current absolute focuser position.
    async fn focus_position(&self) -> Result<i32, DeviceError>;

    /// Focus offset to apply when switching from the current filter to `filter`.
    async fn focus_offset(&self, filter: &str) -> Result<i32, DeviceError>;
}
