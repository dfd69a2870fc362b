#![allow(clippy::doc_markdown)] // Allow technical terms like RA/Dec, ToO in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Pilot Core
//!
//! Orchestration core of a multi-telescope observatory: decides, each night,
//! which target every telescope works on, runs that work concurrently across
//! the fleet, and preempts or resumes it when priorities or conditions change.
//!
//! ## Architecture
//!
//! Leaves first:
//!
//! - [`devices`] - per-telescope device facade contract (consumed, not implemented)
//! - [`action`] - abortable units of work: atomic device actions, single-telescope
//!   sequences, multi-telescope campaigns
//! - [`execution`] - fan-out of one action across telescopes with per-telescope outcomes
//! - [`pool`] - idle-telescope pool and in-flight action registry
//! - [`scoring`] - target ranking against observability and priority
//! - [`scheduler`] - the nightly state machine with ToO preemption and resume
//!
//! Supporting modules: [`cancellation`], [`config`], [`constants`], [`error`],
//! [`logging`], [`models`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pilot_core::config::ConfigManager;
//! use pilot_core::pool::ResourcePool;
//! use pilot_core::scheduler::{Collaborators, NightScheduler};
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     fleet: Vec<pilot_core::devices::Telescope>,
//! #     collaborators: Collaborators,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! pilot_core::logging::init_structured_logging();
//! let config = ConfigManager::load()?.config().clone();
//! let pool = Arc::new(ResourcePool::from_ready(fleet).await);
//!
//! let scheduler = NightScheduler::new(config, pool, collaborators);
//! let summary = scheduler.run().await?;
//! println!("dispatched {} targets", summary.dispatched);
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod cancellation;
pub mod config;
pub mod constants;
pub mod devices;
pub mod error;
pub mod execution;
pub mod logging;
pub mod models;
pub mod pool;
pub mod scheduler;
pub mod scoring;

pub use action::{Action, FocusHistory, ObservationProgress};
pub use cancellation::{AbortScope, AbortToken};
pub use config::{ConfigManager, PilotConfig};
pub use constants::{ObjectType, SchedulerPhase, TargetStatus};
pub use devices::{DeviceCommand, DeviceFacade, DeviceReply, Subsystem, SubsystemStatus, Telescope};
pub use error::{ActionError, ActionResult, DeviceError, PilotError, Result};
pub use execution::{FanOutError, FanOutExecutor, FanOutReport, TelescopeOutcome};
pub use models::{Coordinates, ExposurePlan, ExposureStep, ModeKind, ObservationMode, Target};
pub use pool::{ActionRegistry, Allocation, AllocationPolicy, ResourcePool};
pub use scheduler::{Collaborators, NightScheduler, NightSummary};
pub use scoring::{ScoringConstraints, TargetScorer};
