use super::{DeviceFacade, Subsystem, SubsystemStatus};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Handle to one telescope of the fleet.
///
/// Cloning is cheap; the facade is shared. Ownership of the *right to use*
/// a telescope is tracked by the resource pool, not by this handle.
#[derive(Clone)]
pub struct Telescope {
    name: String,
    device: Arc<dyn DeviceFacade>,
}

impl Telescope {
    pub fn new<N: Into<String>>(name: N, device: Arc<dyn DeviceFacade>) -> Self {
        Self {
            name: name.into(),
            device,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device(&self) -> &Arc<dyn DeviceFacade> {
        &self.device
    }

    /// Snapshot of every subsystem status.
    pub async fn status(&self) -> TelescopeStatus {
        let mut subsystems = BTreeMap::new();
        for subsystem in Subsystem::ALL {
            subsystems.insert(subsystem, self.device.status(subsystem).await);
        }
        TelescopeStatus { subsystems }
    }
}

impl fmt::Debug for Telescope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Telescope").field("name", &self.name).finish()
    }
}

impl PartialEq for Telescope {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Telescope {}

/// Status of all subsystems of one telescope at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelescopeStatus {
    pub subsystems: BTreeMap<Subsystem, SubsystemStatus>,
}

impl TelescopeStatus {
    pub fn get(&self, subsystem: Subsystem) -> SubsystemStatus {
        self.subsystems
            .get(&subsystem)
            .copied()
            .unwrap_or(SubsystemStatus::Unknown)
    }

    /// Ready for new work: every subsystem reports idle.
    pub fn is_ready(&self) -> bool {
        Subsystem::ALL.iter().all(|s| self.get(*s).is_idle())
    }
}
