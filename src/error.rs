//! crate-wide error taxonomy (spec.md §7).

use std::fmt;

/// Reason a capacity acquisition was rejected.
///
/// Mirrors the `TryAcquireResult::reason` discriminant from §6: a negative
/// or otherwise malformed cost is rejected before any state changes, while
/// `insufficient_capacity` is the ordinary backpressure signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    InsufficientCapacity,
    InvalidCost,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientCapacity => f.write_str("insufficient_capacity"),
            Self::InvalidCost => f.write_str("invalid_cost"),
        }
    }
}

/// Unified error type for every fallible operation this crate exposes
/// directly (as opposed to errors surfaced from user-supplied stage
/// closures, which travel through `CoreError::Stage`).
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    /// A pull/push/bidi stage function returned an error. Carries the
    /// boxed original error so callers can downcast.
    #[error("stage function failed: {0}")]
    Stage(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),

    /// Capacity acquisition rejected for a reason other than ordinary
    /// backpressure (negative/invalid cost). `insufficient_capacity` is
    /// not represented as an error — it is the `Ok(false)` backpressure
    /// path and is surfaced via `TryAcquireResult`, never as an `Err`.
    #[error("invalid resource cost: {0:?}")]
    InvalidCost(std::collections::BTreeMap<String, f64>),

    /// `timeout(ms, throw_on_timeout = true)` elapsed before the source
    /// produced a value.
    #[error("pull timed out after {0}ms")]
    Timeout(u64),

    /// A public method was called on a pull chain already marked consumed
    /// (§4.3 "consumed-chain marking").
    #[error("operation attempted on a consumed chain")]
    ConsumedChain,

    /// `DependencyGraph::add_node` detected that inserting the node would
    /// introduce a cycle. No state change is made (§4.6).
    #[error("adding node {0:?} would introduce a cycle")]
    Cycle(String),

    /// `add_node` referenced a dependency key that does not exist in the
    /// graph.
    #[error("unknown dependency key {0:?}")]
    UnknownDependency(String),

    /// `add_node` was called twice with the same key.
    #[error("duplicate node key {0:?}")]
    DuplicateNode(String),

    /// Routing to an unknown labeled sink with `throw_on_nonexistence` set
    /// (§4.2 labeledDistribute, §7 "Unknown token / label").
    #[error("no sink registered for label {0:?}")]
    UnknownLabel(String),

    /// `acquireImmediate`'s precondition (`canAcquire` already returned
    /// true) was violated by a parent rejecting after the local accept
    /// (§4.5). Local state is rolled back before this is raised; it
    /// indicates a caller bug (a `canAcquire`/`acquireImmediate` race
    /// introduced by code outside the single-scheduling-domain contract),
    /// not ordinary backpressure.
    #[error("acquireImmediate precondition violated: parent rejected after local accept")]
    AcquireInvariant,

    /// `raceCutoff`'s cutoff source won the round with `throw_on_cutoff`
    /// set (§4.1 `raceCutoff`, §7 "flag controls throw-vs-silent").
    #[error("race cut off by the cutoff source")]
    Cutoff,
}

impl CoreError {
    /// Wrap an arbitrary user error as a [`CoreError::Stage`].
    pub fn stage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Stage(Box::new(err))
    }
}

/// Convenience alias used throughout the crate's fallible APIs.
pub type CoreResult<T> = Result<T, CoreError>;
