//! # Scheduling
//!
//! The nightly control loop and everything it dispatches through: the
//! collaborator contracts, the observation-mode dispatch table and the
//! dispatch task bookkeeping.

pub mod collaborators;
pub mod dispatch;
pub mod modes;
pub mod night;

pub use collaborators::{Clock, Ephemeris, ObservingWindow, SafetyMonitor, SystemClock, TargetStore};
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use modes::{
    DeepRunner, ModeContext, ModeRun, ModeRunner, ModeTable, SearchRunner, SingleRunner, SpecRunner,
};
pub use night::{Collaborators, NightScheduler, NightSummary, PreemptedEntry};
