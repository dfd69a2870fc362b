//! Resource pool mutual exclusion.

mod common;

use common::strategies::*;
use common::*;
use parking_lot::Mutex;
use pilot_core::devices::{Subsystem, SubsystemStatus};
use pilot_core::pool::{Allocation, AllocationPolicy, ResourcePool};
use pilot_core::Telescope;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

const FLEET: usize = 5;

fn names(telescopes: &[Telescope]) -> Vec<String> {
    telescopes.iter().map(|t| t.name().to_string()).collect()
}

proptest! {
    /// Property: a telescope is never held by two allocations, and every
    /// telescope is either idle or held.
    #[test]
    fn allocations_never_overlap(workload in pool_workload_strategy(FLEET)) {
        let mocks = fleet(FLEET);
        let fleet_names: BTreeSet<String> = mocks.iter().map(|m| m.name().to_string()).collect();
        let pool = ResourcePool::new(telescopes(&mocks));
        let mut held: Vec<Vec<Telescope>> = Vec::new();

        for op in workload {
            match op {
                PoolOp::Allocate(policy) => {
                    let idle_before = pool.idle_count();
                    match pool.allocate(policy) {
                        Allocation::Granted(granted) => {
                            let expected = match policy {
                                AllocationPolicy::Single => 1,
                                AllocationPolicy::Exactly(n) => n.max(1),
                                AllocationPolicy::All => FLEET,
                            };
                            prop_assert_eq!(granted.len(), expected);
                            held.push(granted);
                        }
                        Allocation::Unavailable { requested, idle } => {
                            prop_assert!(requested <= FLEET);
                            prop_assert_eq!(idle, idle_before);
                            prop_assert_eq!(pool.idle_count(), idle_before);
                        }
                        Allocation::Exceeded { requested, capacity } => {
                            prop_assert!(requested > FLEET);
                            prop_assert_eq!(capacity, FLEET);
                            prop_assert_eq!(pool.idle_count(), idle_before);
                        }
                    }
                }
                PoolOp::AllocateNamed(indices) => {
                    let wanted: Vec<String> = indices
                        .into_iter()
                        .collect::<BTreeSet<_>>()
                        .into_iter()
                        .map(|i| format!("7DT{:02}", i + 1))
                        .collect();
                    let all_idle = wanted.iter().all(|n| pool.is_idle(n));
                    match pool.allocate_named(&wanted) {
                        Allocation::Granted(granted) => {
                            prop_assert!(all_idle);
                            prop_assert_eq!(names(&granted), wanted);
                            held.push(granted);
                        }
                        _ => prop_assert!(!all_idle),
                    }
                }
                PoolOp::Release(n) => {
                    if !held.is_empty() {
                        let allocation = held.remove(n % held.len());
                        pool.release(&allocation);
                    }
                }
            }

            let mut seen = BTreeSet::new();
            for name in held.iter().flat_map(|a| names(a)) {
                prop_assert!(seen.insert(name.clone()), "{} held twice", name);
                prop_assert!(!pool.is_idle(&name), "{} both held and idle", name);
            }
            let idle: BTreeSet<String> = pool.idle_names().into_iter().collect();
            let union: BTreeSet<String> = idle.union(&seen).cloned().collect();
            prop_assert_eq!(union, fleet_names.clone());
        }
    }
}

#[test]
fn test_release_is_idempotent() {
    let mocks = fleet(2);
    let pool = ResourcePool::new(telescopes(&mocks));

    let granted = pool.allocate(AllocationPolicy::Single).into_telescopes().unwrap();
    pool.release(&granted);
    pool.release(&granted);
    assert_eq!(pool.idle_count(), 2);

    let stranger = MockTelescope::new("7DT99").telescope();
    pool.release(&[stranger]);
    assert_eq!(pool.idle_count(), 2);
    assert!(!pool.is_idle("7DT99"));
}

#[test]
fn test_only_ready_telescopes_join_the_pool() {
    let mocks = fleet(3);
    mocks[1].set_status(Subsystem::Mount, SubsystemStatus::Parked);
    mocks[2].set_status(Subsystem::Camera, SubsystemStatus::Disconnected);

    let pool = tokio_test::block_on(ResourcePool::from_ready(telescopes(&mocks)));
    assert_eq!(pool.idle_names(), vec!["7DT01".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_allocations_are_exclusive() {
    let mocks = fleet(FLEET);
    let pool = Arc::new(ResourcePool::new(telescopes(&mocks)));
    let holding: Arc<Mutex<BTreeSet<String>>> = Arc::new(Mutex::new(BTreeSet::new()));

    let mut workers = Vec::new();
    for worker in 0..8 {
        let pool = pool.clone();
        let holding = holding.clone();
        workers.push(tokio::spawn(async move {
            let policy = if worker % 2 == 0 {
                AllocationPolicy::Single
            } else {
                AllocationPolicy::Exactly(2)
            };
            for _ in 0..50 {
                let Allocation::Granted(granted) = pool.allocate(policy) else {
                    tokio::task::yield_now().await;
                    continue;
                };
                {
                    let mut holding = holding.lock();
                    for name in names(&granted) {
                        assert!(holding.insert(name.clone()), "{name} granted twice");
                    }
                }
                tokio::task::yield_now().await;
                {
                    let mut holding = holding.lock();
                    for name in names(&granted) {
                        holding.remove(&name);
                    }
                }
                pool.release(&granted);
            }
        }));
    }

    for worker in workers {
        worker.await.unwrap();
    }
    assert_eq!(pool.idle_count(), FLEET);
}
