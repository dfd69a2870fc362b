//! Atomic device actions: each drives exactly one hardware operation (or, for
//! a filter change with focus offset, a relative focuser move followed by the
//! filter selection).

mod change_filter;
mod change_focus;
mod exposure;
mod slew;

pub use change_filter::{ChangeFilter, ChangeFilterParams};
pub use change_focus::{ChangeFocus, FocusMove};
pub use exposure::{Exposure, ExposureParams};
pub use slew::Slew;
