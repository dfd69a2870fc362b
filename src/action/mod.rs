//! # Actions
//!
//! Composable, abortable units of telescope work.
//!
//! ## Hierarchy
//!
//! - **Level 1** ([`level1`]): one device operation each (slew, expose,
//!   change filter, move focuser).
//! - **Level 2** ([`level2`]): single-telescope sequences built from level 1
//!   (autofocus, full observation sequence with resume support).
//! - **Level 3** ([`level3`]): multi-telescope campaigns that fan a level 2
//!   sequence out across a set of telescopes.
//!
//! ## Contract
//!
//! Every action is constructed bound to its telescope(s) and an
//! [`AbortToken`]. `run` is invoked at most once per instance. On entry it
//! verifies the required subsystems are connected (`Connection` otherwise,
//! with no device I/O), then checks the token (`Aborted` otherwise, after
//! calling `abort`), and only then talks to the device. Composite actions
//! re-check the token between every stage.

pub mod level1;
pub mod level2;
pub mod level3;

mod context;
mod focus_history;
mod progress;

pub use context::ActionContext;
pub use focus_history::{FocusHistory, FocusRecord};
pub use progress::{FrameRecord, ObservationProgress};

use crate::error::ActionResult;
use async_trait::async_trait;

/// A single polymorphic unit of telescope work.
#[async_trait]
pub trait Action: Send {
    type Params: Send + 'static;
    type Output: Send + 'static;
    /// Work completed so far; survives abort and failure.
    type Progress: Clone + Default + Send + 'static;

    fn name(&self) -> &'static str;

    async fn run(&mut self, params: Self::Params) -> ActionResult<Self::Output>;

    /// Stop any in-flight hardware operation. Safe to call at any time;
    /// a no-op when nothing is moving.
    async fn abort(&self);

    fn progress(&self) -> Self::Progress {
        Self::Progress::default()
    }
}
