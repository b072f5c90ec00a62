//! Hierarchical capacity balancer (spec.md §4.5 last paragraph, §6
//! "Balancer child config").
//!
//! Grounded on `xitca-server`'s `worker/shutdown.rs` `ShutdownHandle::shutdown`
//! — a plain `tokio::time::interval` poll loop sampling external state on
//! a fixed cadence — generalized from "wait for connections to drain"
//! to "sample utilization, shrink idle children, grow busy ones."

use std::time::{Duration, Instant};

use crate::scheduler::capacity::CapacitySource;
use crate::scheduler::cost::ResourceCost;

/// One child attached to the balancer (spec.md §6 "Balancer child
/// config").
pub struct ChildConfig {
    pub capacity: CapacitySource,
    pub min: ResourceCost,
    pub max: ResourceCost,
}

/// Tunables shared by every child under one balancer.
#[derive(Clone)]
pub struct BalancerOptions {
    pub check_interval: Duration,
    pub idle_time_threshold: Duration,
    pub busy_time_threshold: Duration,
    pub idle_threshold: f64,
    pub busy_threshold: f64,
    pub increment: ResourceCost,
}

struct ChildState {
    config: ChildConfig,
    idle_since: Option<Instant>,
    busy_since: Option<Instant>,
}

/// Periodically samples each child's utilization and shrinks/grows its
/// limits. The sampling loop itself is left to the caller (`run`, below,
/// for the common case of "just drive it on a `tokio::time::interval`")
/// so this type stays testable with externally-supplied timestamps.
pub struct Balancer {
    children: Vec<ChildState>,
    options: BalancerOptions,
}

impl Balancer {
    pub fn new(children: Vec<ChildConfig>, options: BalancerOptions) -> Self {
        Self {
            children: children
                .into_iter()
                .map(|config| ChildState {
                    config,
                    idle_since: None,
                    busy_since: None,
                })
                .collect(),
            options,
        }
    }

    /// One sampling pass. A child is idle when every tracked resource's
    /// utilization is below `idle_threshold` continuously for
    /// `idle_time_threshold`; busy when any resource exceeds
    /// `busy_threshold` continuously for `busy_time_threshold`. After an
    /// adjustment the child's time tracker resets (spec.md §4.5 "After
    /// each adjustment the time tracker for that child resets").
    pub fn tick(&mut self, now: Instant) {
        for child in &mut self.children {
            let utilization = child.config.capacity.utilization();
            let all_idle = utilization.values().all(|u| *u < self.options.idle_threshold);
            let any_busy = utilization.values().any(|u| *u > self.options.busy_threshold);

            if all_idle {
                child.busy_since = None;
                let since = *child.idle_since.get_or_insert(now);
                if now.duration_since(since) >= self.options.idle_time_threshold {
                    Self::shrink(&child.config, &self.options.increment);
                    child.idle_since = None;
                }
            } else if any_busy {
                child.idle_since = None;
                let since = *child.busy_since.get_or_insert(now);
                if now.duration_since(since) >= self.options.busy_time_threshold {
                    Self::grow(&child.config, &self.options.increment);
                    child.busy_since = None;
                }
            } else {
                child.idle_since = None;
                child.busy_since = None;
            }
        }
    }

    fn shrink(config: &ChildConfig, increment: &ResourceCost) {
        let mut limits = config.capacity.limits();
        for (resource, step) in increment {
            let floor = config.min.get(resource).copied().unwrap_or(0.0);
            let current = limits.get(resource).copied().unwrap_or(0.0);
            limits.insert(resource.clone(), (current - step).max(floor));
        }
        config.capacity.set_limits(limits);
    }

    fn grow(config: &ChildConfig, increment: &ResourceCost) {
        let mut limits = config.capacity.limits();
        for (resource, step) in increment {
            let ceiling = config.max.get(resource).copied().unwrap_or(f64::INFINITY);
            let current = limits.get(resource).copied().unwrap_or(0.0);
            limits.insert(resource.clone(), (current + step).min(ceiling));
        }
        config.capacity.set_limits(limits);
    }

    /// Drives `tick` forever at `options.check_interval`. Intended to be
    /// spawned onto a `tokio::task::LocalSet` alongside the rest of the
    /// crate's cooperative single-scheduling-domain components.
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(self.options.check_interval);
        loop {
            interval.tick().await;
            self.tick(Instant::now());
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scheduler::cost::resource_cost;

    fn options() -> BalancerOptions {
        BalancerOptions {
            check_interval: Duration::from_millis(50),
            idle_time_threshold: Duration::from_millis(100),
            busy_time_threshold: Duration::from_millis(100),
            idle_threshold: 0.1,
            busy_threshold: 0.9,
            increment: resource_cost([("gpu", 1.0)]),
        }
    }

    #[test]
    fn shrinks_sustained_idle_child() {
        let capacity = CapacitySource::new(resource_cost([("gpu", 4.0)]));
        let child = ChildConfig {
            capacity: capacity.clone(),
            min: resource_cost([("gpu", 1.0)]),
            max: resource_cost([("gpu", 8.0)]),
        };
        let mut balancer = Balancer::new(vec![child], options());

        let t0 = Instant::now();
        balancer.tick(t0);
        assert_eq!(capacity.limits().get("gpu"), Some(&4.0));
        balancer.tick(t0 + Duration::from_millis(150));
        assert_eq!(capacity.limits().get("gpu"), Some(&3.0));
    }

    #[test]
    fn grows_sustained_busy_child() {
        let capacity = CapacitySource::new(resource_cost([("gpu", 4.0)]));
        capacity.try_acquire(&resource_cost([("gpu", 4.0)]));
        let child = ChildConfig {
            capacity: capacity.clone(),
            min: resource_cost([("gpu", 1.0)]),
            max: resource_cost([("gpu", 8.0)]),
        };
        let mut balancer = Balancer::new(vec![child], options());

        let t0 = Instant::now();
        balancer.tick(t0);
        balancer.tick(t0 + Duration::from_millis(150));
        assert_eq!(capacity.limits().get("gpu"), Some(&5.0));
    }

    #[test]
    fn does_not_shrink_below_floor() {
        let capacity = CapacitySource::new(resource_cost([("gpu", 1.0)]));
        let child = ChildConfig {
            capacity: capacity.clone(),
            min: resource_cost([("gpu", 1.0)]),
            max: resource_cost([("gpu", 8.0)]),
        };
        let mut balancer = Balancer::new(vec![child], options());
        let t0 = Instant::now();
        balancer.tick(t0);
        balancer.tick(t0 + Duration::from_millis(150));
        assert_eq!(capacity.limits().get("gpu"), Some(&1.0));
    }
}
