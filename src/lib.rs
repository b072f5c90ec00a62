//! `stream-core`: composable pull/push/bidirectional async streams, a
//! chain compiler that fuses cardinality-preserving operator stages, and
//! a capacity-gated task scheduler (multi-resource capacity manager,
//! dependency graph, aging priority queue, pool runner, hierarchical
//! balancer) with an optional observability layer.
//!
//! Every stateful type in this crate assumes a single cooperative
//! scheduling domain (spec.md §5): run it on one `tokio` worker thread,
//! or pin the relevant tasks to a `tokio::task::LocalSet`. Nothing here
//! is `Send`.

pub mod chain;
pub mod error;
pub mod metrics;
pub mod pull;
pub mod push;
pub mod scheduler;
pub mod signal;

pub use error::{CoreError, CoreResult};
