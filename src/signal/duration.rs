use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use super::rolling::{RollingStats, RollingWindow};

/// Duration tracker (spec.md §4.9 primitive (d)): a [`RollingWindow`]
/// specialized to elapsed-millisecond observations, with `start(): () ->
/// elapsedMs` returning an independent closure (so the caller need not
/// hold a borrow of the tracker open across the timed section) and
/// `record(ms)` for externally-measured durations.
#[derive(Clone)]
pub struct DurationTracker {
    window: Rc<RefCell<RollingWindow>>,
}

impl DurationTracker {
    pub fn new(window: std::time::Duration) -> Self {
        Self {
            window: Rc::new(RefCell::new(RollingWindow::new(window))),
        }
    }

    /// Begin timing. The returned closure records and returns the elapsed
    /// milliseconds when called.
    pub fn start(&self) -> impl FnOnce() -> f64 + 'static {
        let begin = Instant::now();
        let window = self.window.clone();
        move || {
            let elapsed = begin.elapsed().as_secs_f64() * 1000.0;
            window.borrow_mut().observe(elapsed);
            elapsed
        }
    }

    pub fn record(&self, ms: f64) {
        self.window.borrow_mut().observe(ms);
    }

    pub fn stats(&self) -> RollingStats {
        self.window.borrow_mut().stats()
    }
}
