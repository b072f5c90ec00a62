//! Multi-resource capacity manager (spec.md §4.5).
//!
//! Generalizes `xitca-server`'s single-resource `worker/limit.rs` `Limit`
//! (a connection-count ceiling gating the accept loop) to an arbitrary
//! number of named resources, an optional parent for hierarchical
//! accounting, and runtime limit mutation. The single-scheduling-domain
//! guarantee (§5) is what lets `can_acquire`/`acquire_immediate` be two
//! separate synchronous calls without a race; `try_acquire` is the
//! atomic convenience built from the two.

use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{CoreResult, RejectReason};
use crate::scheduler::cost::{is_valid_cost, ResourceCost, TryAcquireResult};
use crate::signal::Wait;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// One of the six capacity event types the metrics capacity collector
/// consumes (spec.md §4.9, §6 "Collector events").
#[derive(Debug, Clone)]
pub enum CapacityEvent {
    Accept {
        at_ms: u64,
        requested: ResourceCost,
        available_after: ResourceCost,
    },
    Reject {
        at_ms: u64,
        requested: ResourceCost,
        available: ResourceCost,
        reason: RejectReason,
    },
    Release {
        at_ms: u64,
        released: ResourceCost,
        available_after: ResourceCost,
    },
    SetLimits {
        at_ms: u64,
        old_limits: ResourceCost,
        new_limits: ResourceCost,
    },
    Increment {
        at_ms: u64,
        delta: ResourceCost,
        new_limits: ResourceCost,
    },
    Reset {
        at_ms: u64,
        limits: ResourceCost,
    },
}

struct Inner {
    initial_limits: ResourceCost,
    limits: ResourceCost,
    available: ResourceCost,
    parent: Option<CapacitySource>,
    wait: Wait<(), std::convert::Infallible>,
    listeners: Vec<Rc<dyn Fn(&CapacityEvent)>>,
}

/// A `(limits, available, parent?)` triple with atomic multi-resource
/// acquisition (spec.md §3 "Capacity source"). Cheap to clone: clones
/// share the same underlying state, matching the ownership note in §3
/// ("pool runners share ownership of the capacity source with any other
/// task pools attached to the same capacity hierarchy").
#[derive(Clone)]
pub struct CapacitySource {
    inner: Rc<std::cell::RefCell<Inner>>,
}

impl CapacitySource {
    pub fn new(limits: ResourceCost) -> Self {
        Self::with_parent(limits, None)
    }

    pub fn child_of(limits: ResourceCost, parent: CapacitySource) -> Self {
        Self::with_parent(limits, Some(parent))
    }

    fn with_parent(limits: ResourceCost, parent: Option<CapacitySource>) -> Self {
        let source = Self {
            inner: Rc::new(std::cell::RefCell::new(Inner {
                initial_limits: limits.clone(),
                available: limits.clone(),
                limits,
                parent,
                wait: Wait::new(),
                listeners: Vec::new(),
            })),
        };
        let limits = source.inner.borrow().limits.clone();
        source.emit(CapacityEvent::SetLimits {
            at_ms: now_ms(),
            old_limits: ResourceCost::new(),
            new_limits: limits,
        });
        source
    }

    /// Register an observer invoked (synchronously, fire-and-forget) for
    /// every event this source emits. Used to wire up the capacity
    /// metrics collector (spec.md §4.9) without this module depending on
    /// it directly.
    pub fn on_event(&self, listener: impl Fn(&CapacityEvent) + 'static) {
        self.inner.borrow_mut().listeners.push(Rc::new(listener));
    }

    fn emit(&self, event: CapacityEvent) {
        for listener in self.inner.borrow().listeners.iter() {
            listener(&event);
        }
    }

    /// A handle to the internal wait object; resolves whenever `release`,
    /// `setLimits`, `increment`, or `reset` may have freed up room.
    pub fn wait_obj(&self) -> Wait<(), std::convert::Infallible> {
        self.inner.borrow().wait.clone()
    }

    fn local_can_acquire(&self, cost: &ResourceCost) -> bool {
        let inner = self.inner.borrow();
        cost.iter().all(|(resource, amount)| match inner.available.get(resource) {
            Some(avail) => *avail >= *amount,
            // Untracked locally: this source imposes no ceiling on it.
            None => true,
        })
    }

    /// Synchronous: true iff every resource in `cost` is satisfiable here
    /// and, recursively, at every ancestor (spec.md §4.5).
    pub fn can_acquire(&self, cost: &ResourceCost) -> bool {
        if !is_valid_cost(cost) {
            return false;
        }
        if !self.local_can_acquire(cost) {
            return false;
        }
        match self.inner.borrow().parent.clone() {
            Some(parent) => parent.can_acquire(cost),
            None => true,
        }
    }

    /// Synchronous: precondition is that `can_acquire(cost)` just
    /// returned `true`. Decrements local availability, then attempts the
    /// same at the parent; rolls back the local decrement and returns
    /// [`crate::error::CoreError::AcquireInvariant`] if the parent
    /// rejects (a caller-bug indicator, not ordinary backpressure).
    pub fn acquire_immediate(&self, cost: &ResourceCost) -> CoreResult<()> {
        let mut applied = Vec::new();
        {
            let mut inner = self.inner.borrow_mut();
            for (resource, amount) in cost {
                if let Some(avail) = inner.available.get_mut(resource) {
                    *avail -= amount;
                    applied.push((resource.clone(), *amount));
                }
            }
        }
        let parent = self.inner.borrow().parent.clone();
        if let Some(parent) = parent {
            if !parent.can_acquire(cost) {
                let mut inner = self.inner.borrow_mut();
                for (resource, amount) in &applied {
                    if let Some(avail) = inner.available.get_mut(resource) {
                        *avail += amount;
                    }
                }
                tracing::error!(?cost, "parent rejected after local accept, rolling back");
                return Err(crate::error::CoreError::AcquireInvariant);
            }
            parent.acquire_immediate(cost)?;
        }
        let available_after = self.inner.borrow().available.clone();
        self.emit(CapacityEvent::Accept {
            at_ms: now_ms(),
            requested: cost.clone(),
            available_after,
        });
        Ok(())
    }

    /// Atomic `canAcquire` + `acquireImmediate` under the single-threaded
    /// event-loop guarantee (spec.md §4.5 "Convenience").
    pub fn try_acquire(&self, cost: &ResourceCost) -> TryAcquireResult {
        if !is_valid_cost(cost) {
            let available = self.inner.borrow().available.clone();
            self.emit(CapacityEvent::Reject {
                at_ms: now_ms(),
                requested: cost.clone(),
                available: available.clone(),
                reason: RejectReason::InvalidCost,
            });
            return TryAcquireResult::Rejected {
                requested: cost.clone(),
                available,
                reason: RejectReason::InvalidCost,
            };
        }
        if !self.can_acquire(cost) {
            let available = self.inner.borrow().available.clone();
            self.emit(CapacityEvent::Reject {
                at_ms: now_ms(),
                requested: cost.clone(),
                available: available.clone(),
                reason: RejectReason::InsufficientCapacity,
            });
            return TryAcquireResult::Rejected {
                requested: cost.clone(),
                available,
                reason: RejectReason::InsufficientCapacity,
            };
        }
        // `can_acquire` just returned true under the single-scheduling-domain
        // guarantee, so the precondition for `acquire_immediate` holds; a
        // failure here is a genuine invariant violation, not backpressure.
        self.acquire_immediate(cost)
            .expect("acquire_immediate precondition just verified by can_acquire");
        let available_after = self.inner.borrow().available.clone();
        TryAcquireResult::Accepted {
            requested: cost.clone(),
            available_after,
        }
    }

    /// Increments local availability (clamped to local limits), then
    /// recursively releases at the parent, then wakes the wait object.
    pub fn release(&self, cost: &ResourceCost) {
        {
            let mut inner = self.inner.borrow_mut();
            for (resource, amount) in cost {
                if let Some(avail) = inner.available.get_mut(resource) {
                    let limit = inner.limits.get(resource).copied().unwrap_or(f64::INFINITY);
                    *avail = (*avail + amount).min(limit);
                }
            }
        }
        let parent = self.inner.borrow().parent.clone();
        if let Some(parent) = parent {
            parent.release(cost);
        }
        let available_after = self.inner.borrow().available.clone();
        self.emit(CapacityEvent::Release {
            at_ms: now_ms(),
            released: cost.clone(),
            available_after,
        });
        self.inner.borrow().wait.resolve(());
    }

    /// Applies per-resource deltas to both `limits` and `available`
    /// (available clamped to ≥0); can introduce new resource keys.
    /// Shrinking below current in-flight usage is permitted — in-flight
    /// acquisitions release against the new, lower ceiling.
    pub fn set_limits(&self, new_limits: ResourceCost) {
        let old_limits;
        {
            let mut inner = self.inner.borrow_mut();
            old_limits = inner.limits.clone();
            for (resource, new_limit) in &new_limits {
                let old_limit = old_limits.get(resource).copied().unwrap_or(0.0);
                let delta = new_limit - old_limit;
                let avail = inner.available.entry(resource.clone()).or_insert(0.0);
                *avail = (*avail + delta).max(0.0);
                inner.limits.insert(resource.clone(), *new_limit);
            }
        }
        self.emit(CapacityEvent::SetLimits {
            at_ms: now_ms(),
            old_limits,
            new_limits,
        });
        self.inner.borrow().wait.resolve(());
    }

    /// Per-resource grow of both `limits` and `available` (spec.md §4.5
    /// "increment(cost) is a per-resource grow").
    pub fn increment(&self, delta: ResourceCost) {
        {
            let mut inner = self.inner.borrow_mut();
            for (resource, amount) in &delta {
                *inner.limits.entry(resource.clone()).or_insert(0.0) += amount;
                *inner.available.entry(resource.clone()).or_insert(0.0) += amount;
            }
        }
        let new_limits = self.inner.borrow().limits.clone();
        self.emit(CapacityEvent::Increment {
            at_ms: now_ms(),
            delta,
            new_limits,
        });
        self.inner.borrow().wait.resolve(());
    }

    /// Restores `limits` and `available` to the values passed at
    /// construction.
    pub fn reset(&self) {
        let limits;
        {
            let mut inner = self.inner.borrow_mut();
            limits = inner.initial_limits.clone();
            inner.limits = limits.clone();
            inner.available = limits.clone();
        }
        self.emit(CapacityEvent::Reset {
            at_ms: now_ms(),
            limits,
        });
        self.inner.borrow().wait.resolve(());
    }

    pub fn limits(&self) -> ResourceCost {
        self.inner.borrow().limits.clone()
    }

    pub fn available(&self) -> ResourceCost {
        self.inner.borrow().available.clone()
    }

    /// `(limit - available) / limit` per resource; zero-limit resources
    /// report 0 rather than dividing by zero (spec.md §4.5 "Utilization").
    pub fn utilization(&self) -> ResourceCost {
        let inner = self.inner.borrow();
        inner
            .limits
            .iter()
            .map(|(resource, limit)| {
                let value = if *limit == 0.0 {
                    0.0
                } else {
                    let avail = inner.available.get(resource).copied().unwrap_or(0.0);
                    (limit - avail) / limit
                };
                (resource.clone(), value)
            })
            .collect()
    }
}
