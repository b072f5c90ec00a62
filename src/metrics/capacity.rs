//! Capacity collector (spec.md §4.9 "Capacity collector").
//!
//! Subscribes to a [`CapacitySource`]'s event stream and accumulates the
//! signal primitives in [`crate::signal`] into the reporting surface
//! spec.md asks for: totals per event type, per-resource in-flight,
//! per-resource rejected totals (insufficient_capacity only), and
//! rolling-window rates for accept/reject/release.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use crate::error::RejectReason;
use crate::scheduler::capacity::{CapacityEvent, CapacitySource};
use crate::scheduler::cost::ResourceCost;
use crate::signal::{Counter, RollingStats, RollingWindow};

/// Totals per event type (spec.md §4.9 "Reports: totals per event
/// type").
#[derive(Debug, Clone, Copy, Default)]
pub struct CapacityTotals {
    pub accept: u64,
    pub reject: u64,
    pub release: u64,
    pub set_limits: u64,
    pub increment: u64,
    pub reset: u64,
}

/// Rolling-window rate stats for the three data-path event types.
#[derive(Debug, Clone, Copy)]
pub struct CapacityRates {
    pub accept: RollingStats,
    pub reject: RollingStats,
    pub release: RollingStats,
}

struct Inner {
    accept_total: Counter,
    reject_total: Counter,
    release_total: Counter,
    set_limits_total: Counter,
    increment_total: Counter,
    reset_total: Counter,
    in_flight: BTreeMap<String, f64>,
    rejected: BTreeMap<String, f64>,
    accept_rate: RollingWindow,
    reject_rate: RollingWindow,
    release_rate: RollingWindow,
}

/// Consumes the six capacity event types (spec.md §4.9). Constructed
/// independently of any [`CapacitySource`]; call [`CapacityCollector::attach`]
/// to start observing one (or several — a collector may watch more than
/// one source, matching §3's "metrics collectors are held by the
/// components that report to them").
pub struct CapacityCollector {
    inner: RefCell<Inner>,
}

impl CapacityCollector {
    pub fn new(window: Duration) -> Rc<Self> {
        Rc::new(Self {
            inner: RefCell::new(Inner {
                accept_total: Counter::new(),
                reject_total: Counter::new(),
                release_total: Counter::new(),
                set_limits_total: Counter::new(),
                increment_total: Counter::new(),
                reset_total: Counter::new(),
                in_flight: BTreeMap::new(),
                rejected: BTreeMap::new(),
                accept_rate: RollingWindow::new(window),
                reject_rate: RollingWindow::new(window),
                release_rate: RollingWindow::new(window),
            }),
        })
    }

    /// Registers this collector as an observer of `capacity`'s event
    /// stream (spec.md §4.9).
    pub fn attach(self: &Rc<Self>, capacity: &CapacitySource) {
        let this = self.clone();
        capacity.on_event(move |event| this.record(event));
    }

    fn record(&self, event: &CapacityEvent) {
        let mut inner = self.inner.borrow_mut();
        match event {
            CapacityEvent::Accept { requested, .. } => {
                inner.accept_total.add(1);
                inner.accept_rate.observe(1.0);
                for (resource, amount) in requested {
                    *inner.in_flight.entry(resource.clone()).or_insert(0.0) += amount;
                }
            }
            CapacityEvent::Reject { requested, reason, .. } => {
                inner.reject_total.add(1);
                inner.reject_rate.observe(1.0);
                if *reason == RejectReason::InsufficientCapacity {
                    for (resource, amount) in requested {
                        *inner.rejected.entry(resource.clone()).or_insert(0.0) += amount;
                    }
                }
            }
            CapacityEvent::Release { released, .. } => {
                inner.release_total.add(1);
                inner.release_rate.observe(1.0);
                for (resource, amount) in released {
                    *inner.in_flight.entry(resource.clone()).or_insert(0.0) -= amount;
                }
            }
            CapacityEvent::SetLimits { .. } => inner.set_limits_total.add(1),
            CapacityEvent::Increment { .. } => inner.increment_total.add(1),
            CapacityEvent::Reset { .. } => inner.reset_total.add(1),
        }
    }

    pub fn totals(&self) -> CapacityTotals {
        let inner = self.inner.borrow();
        CapacityTotals {
            accept: inner.accept_total.value(),
            reject: inner.reject_total.value(),
            release: inner.release_total.value(),
            set_limits: inner.set_limits_total.value(),
            increment: inner.increment_total.value(),
            reset: inner.reset_total.value(),
        }
    }

    pub fn in_flight(&self) -> ResourceCost {
        self.inner.borrow().in_flight.clone()
    }

    pub fn rejected(&self) -> ResourceCost {
        self.inner.borrow().rejected.clone()
    }

    pub fn rates(&self) -> CapacityRates {
        let mut inner = self.inner.borrow_mut();
        CapacityRates {
            accept: inner.accept_rate.stats(),
            reject: inner.reject_rate.stats(),
            release: inner.release_rate.stats(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scheduler::cost::resource_cost;

    #[test]
    fn ten_accepted_acquires_are_totalled_and_rated() {
        let capacity = CapacitySource::new(resource_cost([("gpu", 100.0)]));
        let collector = CapacityCollector::new(Duration::from_secs(1));
        collector.attach(&capacity);

        for _ in 0..10 {
            assert!(capacity.try_acquire(&resource_cost([("gpu", 1.0)])).is_ok());
        }

        assert_eq!(collector.totals().accept, 10);
        assert_eq!(collector.rates().accept.count, 10);
        assert_eq!(collector.in_flight().get("gpu"), Some(&10.0));
    }

    #[test]
    fn rejection_reasons_split_insufficient_from_invalid() {
        let capacity = CapacitySource::new(resource_cost([("gpu", 1.0)]));
        let collector = CapacityCollector::new(Duration::from_secs(1));
        collector.attach(&capacity);

        capacity.try_acquire(&resource_cost([("gpu", 5.0)]));
        capacity.try_acquire(&resource_cost([("gpu", -1.0)]));

        assert_eq!(collector.totals().reject, 2);
        assert_eq!(collector.rejected().get("gpu"), Some(&5.0));
    }

    #[test]
    fn release_decrements_in_flight() {
        let capacity = CapacitySource::new(resource_cost([("gpu", 2.0)]));
        let collector = CapacityCollector::new(Duration::from_secs(1));
        collector.attach(&capacity);

        capacity.try_acquire(&resource_cost([("gpu", 2.0)]));
        capacity.release(&resource_cost([("gpu", 2.0)]));

        assert_eq!(collector.in_flight().get("gpu"), Some(&0.0));
        assert_eq!(collector.totals().release, 1);
    }
}
