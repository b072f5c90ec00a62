use crate::error::CoreError;
use crate::push::{BoxFuture, PushObj};

/// Rotate pushed values across sinks, one push per sink per turn
/// (spec.md §4.2 `roundRobin` distributor). A sink that reports done is
/// dropped from the rotation; the distributor itself is done once every
/// sink is done.
pub struct PushRoundRobin<S> {
    sinks: Vec<S>,
    active: Vec<usize>,
    cursor: usize,
}

impl<S: PushObj> PushRoundRobin<S> {
    pub fn new(sinks: Vec<S>) -> Self {
        let active = (0..sinks.len()).collect();
        Self { sinks, active, cursor: 0 }
    }
}

impl<S: PushObj> PushObj for PushRoundRobin<S> {
    type Item = S::Item;

    fn next(&mut self, value: S::Item) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            if self.active.is_empty() {
                return true;
            }
            if self.cursor >= self.active.len() {
                self.cursor = 0;
            }
            let idx = self.active[self.cursor];
            let done = self.sinks[idx].next(value).await;
            if done {
                self.active.remove(self.cursor);
            } else {
                self.cursor += 1;
            }
            self.active.is_empty()
        })
    }

    fn return_(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            for &idx in &self.active {
                self.sinks[idx].return_().await;
            }
            self.active.clear();
        })
    }

    fn throw(&mut self, err: CoreError) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            for &idx in &self.active {
                self.sinks[idx].throw(CoreError::stage(std::io::Error::other(err.to_string()))).await;
            }
        })
    }

    fn is_done(&self) -> bool {
        self.active.is_empty()
    }
}
