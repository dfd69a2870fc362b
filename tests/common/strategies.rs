//! Proptest strategies shared by the property tests.

#![allow(dead_code)]

use proptest::prelude::*;
use pilot_core::pool::AllocationPolicy;

/// One step of a randomized pool workload.
#[derive(Debug, Clone)]
pub enum PoolOp {
    Allocate(AllocationPolicy),
    AllocateNamed(Vec<usize>),
    /// Release the n-th outstanding allocation (modulo how many exist).
    Release(usize),
}

pub fn policy_strategy(fleet_size: usize) -> impl Strategy<Value = AllocationPolicy> {
    prop_oneof![
        Just(AllocationPolicy::Single),
        Just(AllocationPolicy::All),
        (0..=fleet_size + 1).prop_map(AllocationPolicy::Exactly),
    ]
}

pub fn pool_op_strategy(fleet_size: usize) -> impl Strategy<Value = PoolOp> {
    prop_oneof![
        3 => policy_strategy(fleet_size).prop_map(PoolOp::Allocate),
        1 => prop::collection::vec(0..fleet_size, 1..=fleet_size).prop_map(PoolOp::AllocateNamed),
        3 => any::<usize>().prop_map(PoolOp::Release),
    ]
}

pub fn pool_workload_strategy(fleet_size: usize) -> impl Strategy<Value = Vec<PoolOp>> {
    prop::collection::vec(pool_op_strategy(fleet_size), 1..40)
}

/// (priority, altitude) pairs for scoring properties.
pub fn candidate_strategy() -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((0.0f64..100.0, -20.0f64..90.0), 1..12)
}

/// Frame counts per filter step.
pub fn plan_counts_strategy() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(1u32..5, 1..4)
}
