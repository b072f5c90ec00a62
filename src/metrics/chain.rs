//! Chain collector (spec.md §4.9 "Chain collector", §8 scenario "Running
//! 100 items through a two-turnstile chain").
//!
//! Turnstile passes report per-checkpoint counts and throughput;
//! sections report entered/left/errored/in-flight/duration; stage pairs
//! report inter-checkpoint latency via either FIFO or item-id
//! correlation, with a bounded pending-correlation table so an item that
//! never reaches the second checkpoint doesn't leak memory forever.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::signal::{Counter, DurationTracker, RollingStats, RollingWindow, UpDownCounter};

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// How a stage pair correlates its two checkpoints' passes (spec.md
/// §4.9: "FIFO correlation... or ID-keyed correlation").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationMode {
    /// Nth pass at `from` pairs with Nth pass at `to`. Correct for
    /// sequential pull and non-reordering push.
    Fifo,
    /// Passes are paired by the `item_id` passed to `on_turnstile_pass`.
    /// Required once filters or variable-latency async stages can
    /// reorder items between the two checkpoints.
    ById,
}

/// Outcome a section left under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionStatus {
    Ok,
    Error,
    Cancelled,
}

/// Opaque handle returned by [`ChainCollector::enter_section`] and
/// required by the matching `leave_section` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionToken(u64);

#[derive(Debug, Clone, Copy, Default)]
pub struct SectionStats {
    pub entered: u64,
    pub left: u64,
    pub errored: u64,
    pub cancelled: u64,
    pub in_flight: i64,
}

struct CheckpointState {
    passed: Counter,
    throughput: RollingWindow,
}

struct SectionState {
    entered: Counter,
    left: Counter,
    errored: Counter,
    cancelled: Counter,
    in_flight: UpDownCounter,
    duration: DurationTracker,
}

enum Pending {
    Fifo(VecDeque<u64>),
    ById {
        map: HashMap<String, u64>,
        order: VecDeque<String>,
    },
}

struct PairState {
    mode: CorrelationMode,
    pending: Pending,
    latency: RollingWindow,
}

struct Inner {
    checkpoints: HashMap<String, CheckpointState>,
    sections: HashMap<String, SectionState>,
    pairs: HashMap<(String, String), PairState>,
    open_sections: HashMap<u64, (String, Instant)>,
    next_token: u64,
    window: Duration,
    max_pending_correlation: usize,
}

/// Consumes turnstile and section events (spec.md §4.9, §6 "Collector
/// events"). Stage pairs must be registered with
/// [`ChainCollector::track_stage_pair`] before passes arrive for them —
/// passes at unregistered checkpoints still count toward per-checkpoint
/// totals, they just don't feed any `"A→B"` latency series.
pub struct ChainCollector {
    inner: RefCell<Inner>,
}

impl ChainCollector {
    pub fn new(window: Duration, max_pending_correlation: usize) -> Self {
        Self {
            inner: RefCell::new(Inner {
                checkpoints: HashMap::new(),
                sections: HashMap::new(),
                pairs: HashMap::new(),
                open_sections: HashMap::new(),
                next_token: 0,
                window,
                max_pending_correlation,
            }),
        }
    }

    /// Registers a `"from→to"` latency series keyed by checkpoint names.
    pub fn track_stage_pair(&self, from: &str, to: &str, mode: CorrelationMode) {
        let mut inner = self.inner.borrow_mut();
        let window = inner.window;
        inner.pairs.entry((from.to_string(), to.to_string())).or_insert_with(|| PairState {
            mode,
            pending: match mode {
                CorrelationMode::Fifo => Pending::Fifo(VecDeque::new()),
                CorrelationMode::ById => Pending::ById {
                    map: HashMap::new(),
                    order: VecDeque::new(),
                },
            },
            latency: RollingWindow::new(window),
        });
    }

    fn checkpoint_entry<'a>(inner: &'a mut Inner, checkpoint: &str) -> &'a mut CheckpointState {
        let window = inner.window;
        inner
            .checkpoints
            .entry(checkpoint.to_string())
            .or_insert_with(|| CheckpointState {
                passed: Counter::new(),
                throughput: RollingWindow::new(window),
            })
    }

    /// Records one pass of `checkpoint` (spec.md §4.9
    /// "onTurnstilePass(checkpoint, itemId?, atMs?)").
    pub fn on_turnstile_pass(&self, checkpoint: &str, item_id: Option<&str>, at_ms: Option<u64>) {
        let at_ms = at_ms.unwrap_or_else(now_ms);
        let mut inner = self.inner.borrow_mut();

        {
            let state = Self::checkpoint_entry(&mut inner, checkpoint);
            state.passed.add(1);
            state.throughput.observe(1.0);
        }

        let max_pending = inner.max_pending_correlation;
        let keys: Vec<(String, String)> = inner.pairs.keys().cloned().collect();
        for (from, to) in keys {
            if from == checkpoint {
                let pair = inner.pairs.get_mut(&(from.clone(), to.clone())).unwrap();
                match &mut pair.pending {
                    Pending::Fifo(queue) => {
                        queue.push_back(at_ms);
                        while queue.len() > max_pending {
                            queue.pop_front();
                        }
                    }
                    Pending::ById { map, order } => {
                        if let Some(id) = item_id {
                            map.insert(id.to_string(), at_ms);
                            order.push_back(id.to_string());
                            while order.len() > max_pending {
                                if let Some(oldest) = order.pop_front() {
                                    map.remove(&oldest);
                                }
                            }
                        }
                    }
                }
            }
            if to == checkpoint {
                let pair = inner.pairs.get_mut(&(from.clone(), to.clone())).unwrap();
                let started_at = match &mut pair.pending {
                    Pending::Fifo(queue) => queue.pop_front(),
                    Pending::ById { map, order } => item_id.and_then(|id| {
                        let started = map.remove(id);
                        if started.is_some() {
                            order.retain(|k| k != id);
                        }
                        started
                    }),
                };
                if let Some(started_at) = started_at {
                    let latency = at_ms.saturating_sub(started_at) as f64;
                    pair.latency.observe(latency);
                }
            }
        }
    }

    fn section_entry<'a>(inner: &'a mut Inner, name: &str) -> &'a mut SectionState {
        let window = inner.window;
        inner.sections.entry(name.to_string()).or_insert_with(|| SectionState {
            entered: Counter::new(),
            left: Counter::new(),
            errored: Counter::new(),
            cancelled: Counter::new(),
            in_flight: UpDownCounter::new(),
            duration: DurationTracker::new(window),
        })
    }

    /// Enters `name`, returning a token that must be passed back to
    /// [`ChainCollector::leave_section`] exactly once.
    pub fn enter_section(&self, name: &str) -> SectionToken {
        let mut inner = self.inner.borrow_mut();
        {
            let state = Self::section_entry(&mut inner, name);
            state.entered.add(1);
            state.in_flight.add(1);
        }
        let token = inner.next_token;
        inner.next_token += 1;
        inner.open_sections.insert(token, (name.to_string(), Instant::now()));
        SectionToken(token)
    }

    /// Leaves the section identified by `token`. `at_ms` is accepted for
    /// API symmetry with `on_turnstile_pass` but duration is measured
    /// from the monotonic clock captured at `enter_section`.
    pub fn leave_section(&self, name: &str, token: SectionToken, status: SectionStatus, _at_ms: Option<u64>) {
        let mut inner = self.inner.borrow_mut();
        let started = inner.open_sections.remove(&token.0).map(|(_, at)| at);
        let state = Self::section_entry(&mut inner, name);
        state.left.add(1);
        state.in_flight.add(-1);
        match status {
            SectionStatus::Ok => {}
            SectionStatus::Error => state.errored.add(1),
            SectionStatus::Cancelled => state.cancelled.add(1),
        }
        if let Some(started) = started {
            state.duration.record(started.elapsed().as_secs_f64() * 1000.0);
        }
    }

    pub fn checkpoint_passed(&self, checkpoint: &str) -> u64 {
        self.inner
            .borrow()
            .checkpoints
            .get(checkpoint)
            .map(|c| c.passed.value())
            .unwrap_or(0)
    }

    pub fn checkpoint_throughput(&self, checkpoint: &str) -> RollingStats {
        let mut inner = self.inner.borrow_mut();
        match inner.checkpoints.get_mut(checkpoint) {
            Some(state) => state.throughput.stats(),
            None => RollingWindow::new(Duration::from_secs(0)).stats(),
        }
    }

    pub fn section_stats(&self, name: &str) -> SectionStats {
        let inner = self.inner.borrow();
        match inner.sections.get(name) {
            Some(state) => SectionStats {
                entered: state.entered.value(),
                left: state.left.value(),
                errored: state.errored.value(),
                cancelled: state.cancelled.value(),
                in_flight: state.in_flight.value(),
            },
            None => SectionStats::default(),
        }
    }

    pub fn section_duration(&self, name: &str) -> RollingStats {
        let inner = self.inner.borrow();
        match inner.sections.get(name) {
            Some(state) => state.duration.stats(),
            None => DurationTracker::new(Duration::from_secs(0)).stats(),
        }
    }

    pub fn stage_latency(&self, from: &str, to: &str) -> RollingStats {
        let mut inner = self.inner.borrow_mut();
        match inner.pairs.get_mut(&(from.to_string(), to.to_string())) {
            Some(pair) => pair.latency.stats(),
            None => RollingWindow::new(Duration::from_secs(0)).stats(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn two_turnstile_chain_reports_100_passes_and_latency() {
        let collector = ChainCollector::new(Duration::from_secs(60), 1000);
        collector.track_stage_pair("in", "out", CorrelationMode::Fifo);

        for _ in 0..100 {
            collector.on_turnstile_pass("in", None, Some(0));
            collector.on_turnstile_pass("out", None, Some(5));
        }

        assert_eq!(collector.checkpoint_passed("in"), 100);
        assert_eq!(collector.checkpoint_passed("out"), 100);
        assert_eq!(collector.stage_latency("in", "out").count, 100);
    }

    #[test]
    fn id_keyed_correlation_pairs_out_of_order_arrivals() {
        let collector = ChainCollector::new(Duration::from_secs(60), 16);
        collector.track_stage_pair("in", "out", CorrelationMode::ById);

        collector.on_turnstile_pass("in", Some("a"), Some(0));
        collector.on_turnstile_pass("in", Some("b"), Some(1));
        // "b" finishes first, "a" second: FIFO would mis-pair these.
        collector.on_turnstile_pass("out", Some("b"), Some(10));
        collector.on_turnstile_pass("out", Some("a"), Some(20));

        let stats = collector.stage_latency("in", "out");
        assert_eq!(stats.count, 2);
        assert_eq!(stats.min, 9.0);
        assert_eq!(stats.max, 20.0);
    }

    #[test]
    fn max_pending_correlation_evicts_oldest_unmatched() {
        let collector = ChainCollector::new(Duration::from_secs(60), 2);
        collector.track_stage_pair("in", "out", CorrelationMode::Fifo);

        collector.on_turnstile_pass("in", None, Some(0));
        collector.on_turnstile_pass("in", None, Some(1));
        collector.on_turnstile_pass("in", None, Some(2));

        collector.on_turnstile_pass("out", None, Some(100));
        let stats = collector.stage_latency("in", "out");
        // the oldest pending (at 0) was evicted; the surviving entry is at 1.
        assert_eq!(stats.count, 1);
        assert_eq!(stats.sum, 99.0);
    }

    #[test]
    fn section_tracks_entered_left_errored_and_in_flight() {
        let collector = ChainCollector::new(Duration::from_secs(60), 16);

        let t1 = collector.enter_section("validate");
        let t2 = collector.enter_section("validate");
        assert_eq!(collector.section_stats("validate").in_flight, 2);

        collector.leave_section("validate", t1, SectionStatus::Ok, None);
        collector.leave_section("validate", t2, SectionStatus::Error, None);

        let stats = collector.section_stats("validate");
        assert_eq!(stats.entered, 2);
        assert_eq!(stats.left, 2);
        assert_eq!(stats.errored, 1);
        assert_eq!(stats.in_flight, 0);
        assert_eq!(collector.section_duration("validate").count, 2);
    }
}
