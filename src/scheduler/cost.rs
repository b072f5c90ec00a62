//! Resource cost and capacity acquisition result types (spec.md §3
//! "Resource cost", §6 "TryAcquire result").

use std::collections::BTreeMap;

use crate::error::RejectReason;

/// A mapping from resource name to a non-negative amount. `BTreeMap` keeps
/// iteration order deterministic, which matters for the capacity
/// collector's per-resource reporting and for `Debug` output in tests.
pub type ResourceCost = BTreeMap<String, f64>;

/// Build a [`ResourceCost`] from `(name, amount)` pairs, e.g.
/// `resource_cost([("gpu", 2.0), ("cpu", 1.0)])`.
pub fn resource_cost<const N: usize>(pairs: [(&str, f64); N]) -> ResourceCost {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// A cost is invalid if any amount is negative (spec.md §4.5 "Negative
/// costs return false").
pub fn is_valid_cost(cost: &ResourceCost) -> bool {
    cost.values().all(|v| *v >= 0.0)
}

/// Outcome of [`crate::scheduler::capacity::CapacitySource::try_acquire`]
/// (spec.md §6 "TryAcquire result").
#[derive(Debug, Clone)]
pub enum TryAcquireResult {
    Accepted {
        requested: ResourceCost,
        available_after: ResourceCost,
    },
    Rejected {
        requested: ResourceCost,
        available: ResourceCost,
        reason: RejectReason,
    },
}

impl TryAcquireResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    pub fn requested(&self) -> &ResourceCost {
        match self {
            Self::Accepted { requested, .. } => requested,
            Self::Rejected { requested, .. } => requested,
        }
    }
}
