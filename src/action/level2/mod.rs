//! Single-telescope sequences composed from atomic actions.

mod autofocus;
mod single_observation;

pub use autofocus::{Autofocus, AutofocusParams};
pub use single_observation::{ObservationParams, SingleObservation};
