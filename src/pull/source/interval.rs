use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};

use crate::pull::{BoxFuture, PullObj};

/// Interval timer source: yields the tick count at a fixed cadence and
/// never terminates on its own (spec.md §4.1 source variant (c)).
pub struct IntervalSource {
    interval: time::Interval,
    ticks: u64,
    closing: bool,
    done: bool,
}

impl IntervalSource {
    pub fn new(period: Duration) -> Self {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval,
            ticks: 0,
            closing: false,
            done: false,
        }
    }
}

impl PullObj for IntervalSource {
    type Item = u64;

    fn next(&mut self) -> BoxFuture<'_, Option<u64>> {
        Box::pin(async move {
            if self.done {
                return None;
            }
            if self.closing {
                self.done = true;
                return None;
            }
            self.interval.tick().await;
            self.ticks += 1;
            Some(self.ticks)
        })
    }

    fn close(&mut self) {
        self.closing = true;
    }

    fn close_interrupt(&mut self) {
        self.closing = true;
        self.done = true;
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_at_cadence() {
        let mut src = IntervalSource::new(Duration::from_millis(10));
        assert_eq!(src.next().await, Some(1));
        assert_eq!(src.next().await, Some(2));
        src.close();
        assert_eq!(src.next().await, None);
    }
}
