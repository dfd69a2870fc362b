//! # Resource Pool & Action Registry
//!
//! The only state shared between the scheduler loop, in-flight dispatch
//! tasks and preemption: which telescopes are idle, and which dispatches are
//! running on which telescopes. Every mutation goes through the operations
//! exposed here; no caller holds either lock across an await.
//!
//! Between any two operations a telescope name is in at most one of {idle
//! set, one registry entry}.

pub mod registry;
pub mod resource_pool;

pub use registry::{ActionRegistry, InFlight, RegistryEntry};
pub use resource_pool::{Allocation, AllocationPolicy, ResourcePool};
