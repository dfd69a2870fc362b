//! # Observation Models
//!
//! Read-mostly records describing what is requested of the fleet. The core
//! reads target fields and writes status transitions; storage lives elsewhere.

pub mod exposure;
pub mod target;

pub use exposure::{ExposurePlan, ExposureStep};
pub use target::{Coordinates, ModeKind, Observability, ObservationMode, Target};
