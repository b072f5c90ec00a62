use std::collections::HashMap;
use std::hash::Hash;

use crate::error::CoreError;
use crate::push::{BoxFuture, PushObj};

/// Route each pushed value to a labeled sink chosen by `key_of` (spec.md
/// §4.2 `labeledDistribute`). With `throw_on_nonexistence` set, routing a
/// value whose key has no registered sink is surfaced as an error via
/// [`LabeledDistribute::take_error`]; otherwise it is silently dropped
/// (spec.md §7 "Unknown token / label").
pub struct LabeledDistribute<L, S, F> {
    sinks: HashMap<L, S>,
    done: HashMap<L, bool>,
    key_of: F,
    throw_on_nonexistence: bool,
    error: Option<CoreError>,
}

impl<L, S, F> LabeledDistribute<L, S, F>
where
    L: Eq + Hash + Clone,
    S: PushObj,
{
    pub fn new(sinks: HashMap<L, S>, key_of: F, throw_on_nonexistence: bool) -> Self {
        let done = sinks.keys().cloned().map(|k| (k, false)).collect();
        Self { sinks, done, key_of, throw_on_nonexistence, error: None }
    }

    pub fn take_error(&mut self) -> Option<CoreError> {
        self.error.take()
    }
}

impl<L, S, F> PushObj for LabeledDistribute<L, S, F>
where
    L: Eq + Hash + Clone + std::fmt::Debug,
    S: PushObj,
    F: FnMut(&S::Item) -> L,
{
    type Item = S::Item;

    fn next(&mut self, value: S::Item) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            let key = (self.key_of)(&value);
            match self.sinks.get_mut(&key) {
                Some(sink) => {
                    let done = sink.next(value).await;
                    self.done.insert(key, done);
                }
                None if self.throw_on_nonexistence => {
                    self.error = Some(CoreError::UnknownLabel(format!("{key:?}")));
                }
                None => {}
            }
            self.is_done()
        })
    }

    fn return_(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            for (key, sink) in self.sinks.iter_mut() {
                sink.return_().await;
                self.done.insert(key.clone(), true);
            }
        })
    }

    fn throw(&mut self, err: CoreError) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            for sink in self.sinks.values_mut() {
                sink.throw(CoreError::stage(std::io::Error::other(err.to_string()))).await;
            }
        })
    }

    fn is_done(&self) -> bool {
        self.done.values().all(|d| *d)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::push::sink::ArrayCollector;

    #[tokio::test]
    async fn routes_by_label_and_drops_unknown_silently() {
        let mut sinks = HashMap::new();
        sinks.insert("a", ArrayCollector::new());
        sinks.insert("b", ArrayCollector::new());
        let mut d = LabeledDistribute::new(sinks, |v: &(&str, i32)| v.0, false);
        d.next(("a", 1)).await;
        d.next(("z", 99)).await;
        assert_eq!(d.sinks["a"].buffer(), &[("a", 1)]);
        assert!(d.take_error().is_none());
    }

    #[tokio::test]
    async fn throws_on_unknown_when_configured() {
        let mut sinks = HashMap::new();
        sinks.insert("a", ArrayCollector::new());
        let mut d = LabeledDistribute::new(sinks, |v: &(&str, i32)| v.0, true);
        d.next(("z", 1)).await;
        assert!(d.take_error().is_some());
    }
}
