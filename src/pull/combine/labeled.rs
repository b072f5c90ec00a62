use std::collections::BTreeMap;
use std::hash::Hash;

use crate::pull::{BoxFuture, PullObj};

/// Labeled variant of [`super::Zip`]: keys a map of sources by `L` and
/// emits a `BTreeMap<L, V>` per round instead of a positional `Vec`
/// (spec.md §4.1 "Labeled variants ... emit either a `Map<L, V>`
/// (labeled zip)"). `BTreeMap` is used (rather than `HashMap`) purely so
/// test assertions get a deterministic iteration order; it carries no
/// semantic weight.
pub struct LabeledZip<L, P> {
    sources: Vec<(L, P)>,
    active: Vec<usize>,
}

impl<L: Ord + Clone, P: PullObj> LabeledZip<L, P> {
    pub fn new(sources: Vec<(L, P)>) -> Self {
        let active = (0..sources.len()).collect();
        Self { sources, active }
    }
}

impl<L: Ord + Clone, P: PullObj> PullObj for LabeledZip<L, P> {
    type Item = BTreeMap<L, P::Item>;

    fn next(&mut self) -> BoxFuture<'_, Option<BTreeMap<L, P::Item>>> {
        Box::pin(async move {
            if self.active.is_empty() {
                return None;
            }
            let mut out = BTreeMap::new();
            let mut still_active = Vec::with_capacity(self.active.len());
            for &idx in &self.active {
                let (label, src) = &mut self.sources[idx];
                if let Some(v) = src.next().await {
                    out.insert(label.clone(), v);
                    still_active.push(idx);
                }
            }
            self.active = still_active;
            if out.is_empty() { None } else { Some(out) }
        })
    }

    fn close(&mut self) {
        for (_, s) in &mut self.sources {
            s.close();
        }
    }

    fn close_interrupt(&mut self) {
        for (_, s) in &mut self.sources {
            s.close_interrupt();
        }
        self.active.clear();
    }

    fn is_done(&self) -> bool {
        self.active.is_empty()
    }
}

/// `{key, value}` pair emitted by [`LabeledRoundRobin`] (spec.md §4.1
/// "or `{key, value}` pairs").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue<L, V> {
    pub key: L,
    pub value: V,
}

/// Labeled variant of [`super::RoundRobin`]: rotates through a labeled
/// set of sources, emitting `{key, value}` pairs.
pub struct LabeledRoundRobin<L, P> {
    sources: Vec<(L, P)>,
    active: Vec<usize>,
    cursor: usize,
}

impl<L: Clone + Eq + Hash, P: PullObj> LabeledRoundRobin<L, P> {
    pub fn new(sources: Vec<(L, P)>) -> Self {
        let active = (0..sources.len()).collect();
        Self { sources, active, cursor: 0 }
    }
}

impl<L: Clone + Eq + Hash, P: PullObj> PullObj for LabeledRoundRobin<L, P> {
    type Item = KeyValue<L, P::Item>;

    fn next(&mut self) -> BoxFuture<'_, Option<KeyValue<L, P::Item>>> {
        Box::pin(async move {
            while !self.active.is_empty() {
                if self.cursor >= self.active.len() {
                    self.cursor = 0;
                }
                let idx = self.active[self.cursor];
                let (label, src) = &mut self.sources[idx];
                match src.next().await {
                    Some(v) => {
                        let key = label.clone();
                        self.cursor += 1;
                        return Some(KeyValue { key, value: v });
                    }
                    None => {
                        self.active.remove(self.cursor);
                    }
                }
            }
            None
        })
    }

    fn close(&mut self) {
        for (_, s) in &mut self.sources {
            s.close();
        }
    }

    fn close_interrupt(&mut self) {
        for (_, s) in &mut self.sources {
            s.close_interrupt();
        }
        self.active.clear();
    }

    fn is_done(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pull::source::{ArrayDrainOrder, ArraySource};

    #[tokio::test]
    async fn labeled_zip_emits_map() {
        let a = ArraySource::one_shot(vec![1, 2], ArrayDrainOrder::Fifo);
        let b = ArraySource::one_shot(vec![10, 20], ArrayDrainOrder::Fifo);
        let mut z = LabeledZip::new(vec![("a", a), ("b", b)]);
        let first = z.next().await.unwrap();
        assert_eq!(first.get("a"), Some(&1));
        assert_eq!(first.get("b"), Some(&10));
    }
}
