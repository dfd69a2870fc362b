//! # System Constants
//!
//! Status values shared with the external target store, scheduler phases,
//! and the default timing constants of the nightly loop.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Persisted lifecycle of a target.
///
/// These transition values are the only durable side effect the core produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    /// Waiting to be selected
    #[default]
    Unscheduled,
    /// Dispatched to telescopes
    Scheduled,
    /// All requested work completed
    Observed,
    /// A device operation reported failure
    Failed,
    /// Cancelled by preemption or shutdown
    Aborted,
    /// Withdrawn ToO request
    Retracted,
}

impl TargetStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Observed | Self::Failed | Self::Retracted)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Unscheduled)
    }
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unscheduled => write!(f, "unscheduled"),
            Self::Scheduled => write!(f, "scheduled"),
            Self::Observed => write!(f, "observed"),
            Self::Failed => write!(f, "failed"),
            Self::Aborted => write!(f, "aborted"),
            Self::Retracted => write!(f, "retracted"),
        }
    }
}

impl std::str::FromStr for TargetStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unscheduled" => Ok(Self::Unscheduled),
            "scheduled" => Ok(Self::Scheduled),
            "observed" => Ok(Self::Observed),
            "failed" => Ok(Self::Failed),
            "aborted" => Ok(Self::Aborted),
            "retracted" => Ok(Self::Retracted),
            _ => Err(format!("Invalid target status: {s}")),
        }
    }
}

/// Class of an observation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    #[default]
    Ordinary,
    /// Target of Opportunity: preempts ordinary work
    #[serde(rename = "too")]
    TargetOfOpportunity,
}

impl ObjectType {
    pub fn is_too(&self) -> bool {
        matches!(self, Self::TargetOfOpportunity)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ordinary => write!(f, "ordinary"),
            Self::TargetOfOpportunity => write!(f, "too"),
        }
    }
}

/// Phases of the nightly scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerPhase {
    #[default]
    WaitingForWindow,
    Running,
    AwaitingToo,
    AwaitingSafe,
    Finished,
}

impl fmt::Display for SchedulerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitingForWindow => write!(f, "waiting_for_window"),
            Self::Running => write!(f, "running"),
            Self::AwaitingToo => write!(f, "awaiting_too"),
            Self::AwaitingSafe => write!(f, "awaiting_safe"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// Default timing of the nightly loop, in milliseconds.
pub mod system {
    pub const WINDOW_POLL_INTERVAL_MS: u64 = 5_000;
    pub const LOOP_INTERVAL_MS: u64 = 500;
    pub const DRAIN_POLL_INTERVAL_MS: u64 = 200;
    pub const RESUME_STAGGER_MS: u64 = 500;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_target_status_round_trips_through_strings() {
        for status in [
            TargetStatus::Unscheduled,
            TargetStatus::Scheduled,
            TargetStatus::Observed,
            TargetStatus::Failed,
            TargetStatus::Aborted,
            TargetStatus::Retracted,
        ] {
            assert_eq!(TargetStatus::from_str(&status.to_string()), Ok(status));
        }
        assert!(TargetStatus::from_str("done").is_err());
    }

    #[test]
    fn test_aborted_is_not_terminal() {
        assert!(!TargetStatus::Aborted.is_terminal());
        assert!(TargetStatus::Observed.is_terminal());
        assert!(TargetStatus::Unscheduled.is_pending());
    }

    #[test]
    fn test_object_type_serde() {
        let too: ObjectType = serde_json::from_str("\"too\"").unwrap();
        assert!(too.is_too());
        let ordinary: ObjectType = serde_json::from_str("\"ordinary\"").unwrap();
        assert!(!ordinary.is_too());
    }
}
