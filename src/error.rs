//! Error types for the telescope pilot.
//!
//! Three layers of errors exist:
//! - [`DeviceError`] is what a device facade reports for a single hardware call.
//! - [`ActionError`] is the terminal failure category of an [`Action`](crate::action::Action).
//! - [`PilotError`] is the crate-level error surfaced by the scheduler and loaders.

use crate::devices::Subsystem;
use thiserror::Error;

pub use crate::config::ConfigurationError;

/// Failure reported by a device facade for one hardware operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeviceError {
    #[error("{0} is disconnected")]
    Disconnected(Subsystem),
    #[error("{subsystem} operation failed: {reason}")]
    Failed { subsystem: Subsystem, reason: String },
    #[error("{0} operation was aborted")]
    Aborted(Subsystem),
}

/// Terminal failure of an action run.
///
/// `Aborted` is a distinguished terminal state rather than a failure: a target
/// whose action ends in `Aborted` is marked `aborted`, never `failed`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    #[error("[{action}] on {telescope} failed: {subsystem} is disconnected")]
    Connection {
        action: String,
        telescope: String,
        subsystem: Subsystem,
    },
    #[error("[{action}] on {telescope} is aborted")]
    Aborted { action: String, telescope: String },
    #[error("[{action}] on {telescope} failed: {reason}")]
    ActionFailed {
        action: String,
        telescope: String,
        reason: String,
    },
}

impl ActionError {
    pub fn connection(action: &str, telescope: &str, subsystem: Subsystem) -> Self {
        Self::Connection {
            action: action.to_string(),
            telescope: telescope.to_string(),
            subsystem,
        }
    }

    pub fn aborted(action: &str, telescope: &str) -> Self {
        Self::Aborted {
            action: action.to_string(),
            telescope: telescope.to_string(),
        }
    }

    pub fn failed<R: Into<String>>(action: &str, telescope: &str, reason: R) -> Self {
        Self::ActionFailed {
            action: action.to_string(),
            telescope: telescope.to_string(),
            reason: reason.into(),
        }
    }

    /// Translate a device-level failure into the action taxonomy.
    pub fn from_device(action: &str, telescope: &str, error: DeviceError) -> Self {
        match error {
            DeviceError::Disconnected(subsystem) => Self::connection(action, telescope, subsystem),
            DeviceError::Aborted(_) => Self::aborted(action, telescope),
            DeviceError::Failed { subsystem, reason } => {
                Self::failed(action, telescope, format!("{subsystem}: {reason}"))
            }
        }
    }

    /// Re-tag an error raised by a sub-action with the enclosing action name,
    /// keeping its category.
    pub fn within(self, action: &str) -> Self {
        match self {
            Self::Connection {
                telescope,
                subsystem,
                ..
            } => Self::Connection {
                action: action.to_string(),
                telescope,
                subsystem,
            },
            Self::Aborted { telescope, .. } => Self::Aborted {
                action: action.to_string(),
                telescope,
            },
            Self::ActionFailed {
                action: inner,
                telescope,
                reason,
            } => Self::ActionFailed {
                action: action.to_string(),
                telescope,
                reason: format!("{inner}: {reason}"),
            },
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    pub fn telescope(&self) -> &str {
        match self {
            Self::Connection { telescope, .. }
            | Self::Aborted { telescope, .. }
            | Self::ActionFailed { telescope, .. } => telescope,
        }
    }
}

pub type ActionResult<T> = std::result::Result<T, ActionError>;

/// Crate-level errors.
#[derive(Debug, Error)]
pub enum PilotError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Target store error: {0}")]
    Store(String),
    #[error("Invalid target {target_id}: {reason}")]
    InvalidTarget { target_id: String, reason: String },
    #[error("Allocation error: {0}")]
    Allocation(String),
    #[error("Dispatch error: {0}")]
    Dispatch(String),
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error("Scheduler aborted: {0}")]
    SchedulerAborted(String),
}

impl From<serde_json::Error> for PilotError {
    fn from(error: serde_json::Error) -> Self {
        PilotError::Store(format!("JSON serialization error: {error}"))
    }
}

pub type Result<T> = std::result::Result<T, PilotError>;
