use crate::devices::Telescope;
use crate::logging::log_pool_operation;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// How many telescopes a dispatch needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationPolicy {
    /// Any one idle telescope.
    Single,
    /// Exactly `n` telescopes, all or nothing.
    Exactly(usize),
    /// The whole fleet; only granted when every telescope is idle.
    All,
}

/// Result of an allocation request. Not enough idle telescopes is a normal
/// scheduling outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Allocation {
    Granted(Vec<Telescope>),
    /// Too few telescopes are idle right now; a later request may succeed.
    Unavailable { requested: usize, idle: usize },
    /// More telescopes than the fleet holds; no request of this size can succeed.
    Exceeded { requested: usize, capacity: usize },
}

impl Allocation {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }

    pub fn into_telescopes(self) -> Option<Vec<Telescope>> {
        match self {
            Self::Granted(telescopes) => Some(telescopes),
            Self::Unavailable { .. } | Self::Exceeded { .. } => None,
        }
    }
}

/// Idle-telescope set of a fixed fleet.
#[derive(Debug)]
pub struct ResourcePool {
    fleet: BTreeMap<String, Telescope>,
    idle: Mutex<BTreeMap<String, Telescope>>,
}

impl ResourcePool {
    /// Pool with every telescope of `fleet` idle.
    pub fn new(fleet: Vec<Telescope>) -> Self {
        let fleet: BTreeMap<String, Telescope> = fleet
            .into_iter()
            .map(|t| (t.name().to_string(), t))
            .collect();
        let idle = fleet.clone();
        Self {
            fleet,
            idle: Mutex::new(idle),
        }
    }

    /// Pool whose idle set holds only the telescopes whose every subsystem
    /// currently reports idle. The others are part of the fleet but must be
    /// released explicitly once they become usable.
    pub async fn from_ready(fleet: Vec<Telescope>) -> Self {
        let mut ready = BTreeMap::new();
        for telescope in &fleet {
            let status = telescope.status().await;
            if status.is_ready() {
                ready.insert(telescope.name().to_string(), telescope.clone());
            } else {
                warn!(
                    telescope = %telescope.name(),
                    status = ?status.subsystems,
                    "Telescope not ready, left out of the idle pool"
                );
            }
        }
        let pool = Self::new(fleet);
        info!(
            fleet = pool.fleet.len(),
            ready = ready.len(),
            "Resource pool initialized"
        );
        *pool.idle.lock() = ready;
        pool
    }

    pub fn fleet(&self) -> impl Iterator<Item = &Telescope> {
        self.fleet.values()
    }

    pub fn fleet_size(&self) -> usize {
        self.fleet.len()
    }

    pub fn telescope(&self, name: &str) -> Option<&Telescope> {
        self.fleet.get(name)
    }

    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    pub fn idle_names(&self) -> Vec<String> {
        self.idle.lock().keys().cloned().collect()
    }

    pub fn is_idle(&self, name: &str) -> bool {
        self.idle.lock().contains_key(name)
    }

    /// Atomically remove telescopes from the idle set according to `policy`.
    pub fn allocate(&self, policy: AllocationPolicy) -> Allocation {
        let mut idle = self.idle.lock();
        let requested = match policy {
            AllocationPolicy::Single => 1,
            AllocationPolicy::Exactly(n) => n.max(1),
            AllocationPolicy::All => self.fleet.len().max(1),
        };

        if requested > self.fleet.len() {
            return Allocation::Exceeded {
                requested,
                capacity: self.fleet.len(),
            };
        }
        if idle.len() < requested {
            return Allocation::Unavailable {
                requested,
                idle: idle.len(),
            };
        }

        let names: Vec<String> = idle.keys().take(requested).cloned().collect();
        let granted: Vec<Telescope> = names.iter().filter_map(|n| idle.remove(n)).collect();
        let remaining = idle.len();
        drop(idle);

        log_pool_operation("allocate", &names, remaining);
        Allocation::Granted(granted)
    }

    /// Atomically take exactly the named telescopes, or none of them.
    pub fn allocate_named(&self, names: &[String]) -> Allocation {
        let mut idle = self.idle.lock();
        let available = names.iter().filter(|n| idle.contains_key(*n)).count();
        if names.is_empty() || available < names.len() {
            return Allocation::Unavailable {
                requested: names.len(),
                idle: available,
            };
        }

        let granted: Vec<Telescope> = names.iter().filter_map(|n| idle.remove(n)).collect();
        let remaining = idle.len();
        drop(idle);

        log_pool_operation("allocate_named", names, remaining);
        Allocation::Granted(granted)
    }

    /// Return telescopes to the idle set. Releasing a telescope that is
    /// already idle is a no-op.
    pub fn release(&self, telescopes: &[Telescope]) {
        let mut idle = self.idle.lock();
        let mut released = Vec::with_capacity(telescopes.len());
        for telescope in telescopes {
            if !self.fleet.contains_key(telescope.name()) {
                warn!(telescope = %telescope.name(), "Release of a telescope outside the fleet ignored");
                continue;
            }
            idle.insert(telescope.name().to_string(), telescope.clone());
            released.push(telescope.name().to_string());
        }
        let remaining = idle.len();
        drop(idle);

        log_pool_operation("release", &released, remaining);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{DeviceCommand, DeviceFacade, DeviceReply, Subsystem, SubsystemStatus};
    use crate::error::DeviceError;
    use async_trait::async_trait;
    use std::sync::Arc;

    #[derive(Debug)]
    struct StaticDevice(SubsystemStatus);

    #[async_trait]
    impl DeviceFacade for StaticDevice {
        async fn status(&self, _subsystem: Subsystem) -> SubsystemStatus {
            self.0
        }
        async fn run(&self, _command: DeviceCommand) -> Result<DeviceReply, DeviceError> {
            Ok(DeviceReply::Done)
        }
        async fn abort(&self, _subsystem: Subsystem) {}
        async fn current_filter(&self) -> Result<String, DeviceError> {
            Ok("g".to_string())
        }
        async fn focus_position(&self) -> Result<i32, DeviceError> {
            Ok(0)
        }
        async fn focus_offset(&self, _filter: &str) -> Result<i32, DeviceError> {
            Ok(0)
        }
    }

    fn fleet(n: usize) -> Vec<Telescope> {
        (1..=n)
            .map(|i| {
                Telescope::new(
                    format!("7DT{i:02}"),
                    Arc::new(StaticDevice(SubsystemStatus::Idle)),
                )
            })
            .collect()
    }

    #[test]
    fn test_single_takes_any_one() {
        let pool = ResourcePool::new(fleet(3));
        let granted = pool.allocate(AllocationPolicy::Single).into_telescopes().unwrap();
        assert_eq!(granted.len(), 1);
        assert_eq!(pool.idle_count(), 2);
        assert!(!pool.is_idle(granted[0].name()));
    }

    #[test]
    fn test_exactly_is_all_or_nothing() {
        let pool = ResourcePool::new(fleet(3));
        let first = pool.allocate(AllocationPolicy::Exactly(2));
        assert!(first.is_granted());

        let second = pool.allocate(AllocationPolicy::Exactly(2));
        assert_eq!(
            second,
            Allocation::Unavailable {
                requested: 2,
                idle: 1
            }
        );
        // rejected request leaves the idle set untouched
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn test_request_beyond_fleet_is_exceeded() {
        let pool = ResourcePool::new(fleet(2));
        assert_eq!(
            pool.allocate(AllocationPolicy::Exactly(3)),
            Allocation::Exceeded {
                requested: 3,
                capacity: 2
            }
        );
        assert_eq!(pool.idle_count(), 2);

        // busy but satisfiable is only unavailable
        let one = pool.allocate(AllocationPolicy::Single).into_telescopes().unwrap();
        assert!(matches!(
            pool.allocate(AllocationPolicy::Exactly(2)),
            Allocation::Unavailable { requested: 2, idle: 1 }
        ));
        pool.release(&one);
        assert!(pool.allocate(AllocationPolicy::Exactly(2)).is_granted());
    }

    #[test]
    fn test_all_requires_whole_fleet() {
        let pool = ResourcePool::new(fleet(3));
        let one = pool.allocate(AllocationPolicy::Single).into_telescopes().unwrap();
        assert!(!pool.allocate(AllocationPolicy::All).is_granted());

        pool.release(&one);
        let all = pool.allocate(AllocationPolicy::All).into_telescopes().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn test_release_is_idempotent() {
        let pool = ResourcePool::new(fleet(2));
        let taken = pool.allocate(AllocationPolicy::Single).into_telescopes().unwrap();
        pool.release(&taken);
        pool.release(&taken);
        assert_eq!(pool.idle_count(), 2);
    }

    #[test]
    fn test_allocate_named() {
        let pool = ResourcePool::new(fleet(3));
        let names = vec!["7DT01".to_string(), "7DT03".to_string()];
        let granted = pool.allocate_named(&names).into_telescopes().unwrap();
        assert_eq!(granted.len(), 2);
        assert_eq!(pool.idle_names(), vec!["7DT02".to_string()]);

        // one of the two is busy: nothing is taken
        pool.release(&granted[..1]);
        assert!(!pool.allocate_named(&names).is_granted());
        assert_eq!(pool.idle_count(), 2);
    }

    #[tokio::test]
    async fn test_from_ready_skips_busy_telescopes() {
        let mut telescopes = fleet(2);
        telescopes.push(Telescope::new(
            "7DT03",
            Arc::new(StaticDevice(SubsystemStatus::Busy)),
        ));
        let pool = ResourcePool::from_ready(telescopes).await;
        assert_eq!(pool.fleet_size(), 3);
        assert_eq!(pool.idle_count(), 2);
        assert!(!pool.is_idle("7DT03"));
    }
}
