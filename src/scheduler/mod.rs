//! Capacity-gated task scheduling (spec.md §4.5–§4.8): a multi-resource
//! capacity manager, a dependency graph, an aging priority source, and
//! the pool runner that drives scheduled tasks across all three.

pub mod balancer;
pub mod capacity;
pub mod cost;
pub mod dag;
pub mod pool;
pub mod priority;

pub use balancer::{Balancer, BalancerOptions, ChildConfig};
pub use capacity::{CapacityEvent, CapacitySource};
pub use cost::{resource_cost, ResourceCost, TryAcquireResult};
pub use dag::{DependencyGraph, NodeState};
pub use pool::{PoolRunner, ProgressEnvelope, ScheduledTask, TaskSource, TaskStep, VecTaskSource};
pub use priority::{PriorityDagSource, PrioritySource};
