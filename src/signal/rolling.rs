use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Aggregate view over a [`RollingWindow`]'s current contents (spec.md
/// §4.9 primitive (c): "count/sum/avg/min/max over `windowMs`").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingStats {
    pub count: u64,
    pub sum: f64,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

impl RollingStats {
    fn empty() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            avg: 0.0,
            min: 0.0,
            max: 0.0,
        }
    }
}

/// A rolling window of timestamped observations. Eviction is lazy: stale
/// entries (older than `window`) are dropped the next time the window is
/// read or written, never on a background timer.
///
/// No direct teacher analog; grounded on the general "ring of timestamped
/// samples, evict on read" pattern common to the pack's scheduler/metrics
/// code. Plain `VecDeque`, no additional dependency.
pub struct RollingWindow {
    window: Duration,
    samples: VecDeque<(Instant, f64)>,
}

impl RollingWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            samples: VecDeque::new(),
        }
    }

    fn evict(&mut self, now: Instant) {
        while let Some((t, _)) = self.samples.front() {
            if now.duration_since(*t) > self.window {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Record an observation at `now`.
    pub fn observe_at(&mut self, now: Instant, value: f64) {
        self.evict(now);
        self.samples.push_back((now, value));
    }

    pub fn observe(&mut self, value: f64) {
        self.observe_at(Instant::now(), value);
    }

    /// Compute aggregate stats over the window as of `now`, evicting stale
    /// samples in the process.
    pub fn stats_at(&mut self, now: Instant) -> RollingStats {
        self.evict(now);
        if self.samples.is_empty() {
            return RollingStats::empty();
        }
        let count = self.samples.len() as u64;
        let sum: f64 = self.samples.iter().map(|(_, v)| *v).sum();
        let min = self.samples.iter().map(|(_, v)| *v).fold(f64::INFINITY, f64::min);
        let max = self.samples.iter().map(|(_, v)| *v).fold(f64::NEG_INFINITY, f64::max);
        RollingStats {
            count,
            sum,
            avg: sum / count as f64,
            min,
            max,
        }
    }

    pub fn stats(&mut self) -> RollingStats {
        self.stats_at(Instant::now())
    }

    /// Rate of observations per second over the window, as of `now`.
    pub fn rate_per_sec_at(&mut self, now: Instant) -> f64 {
        self.evict(now);
        let secs = self.window.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.samples.len() as f64 / secs
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn evicts_stale_samples() {
        let mut w = RollingWindow::new(Duration::from_millis(100));
        let t0 = Instant::now();
        w.observe_at(t0, 1.0);
        w.observe_at(t0 + Duration::from_millis(50), 2.0);
        let stats = w.stats_at(t0 + Duration::from_millis(150));
        // t0's sample (age 150ms) is evicted; only the second (age 100ms) remains
        assert_eq!(stats.count, 1);
        assert_eq!(stats.sum, 2.0);
    }

    #[test]
    fn aggregates_min_max_avg() {
        let mut w = RollingWindow::new(Duration::from_secs(1));
        let t0 = Instant::now();
        for v in [1.0, 5.0, 3.0] {
            w.observe_at(t0, v);
        }
        let stats = w.stats_at(t0);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
        assert!((stats.avg - 3.0).abs() < 1e-9);
    }
}
