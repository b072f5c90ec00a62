use std::collections::HashSet;
use std::hash::Hash;

use crate::pull::{BoxFuture, PullObj};

/// Drop repeats of a key derived from each value (spec.md §4.1 `dedupe`).
/// The key set is stateful and is reset whenever the chain compiler swaps
/// the source of a compiled chain (spec.md §4.4 point 5, tested in §8
/// "Swapping the source of a compiled chain resets stateful operators").
pub struct Dedupe<P, F, K> {
    upstream: P,
    key_fn: F,
    seen: HashSet<K>,
}

impl<P, F, K> Dedupe<P, F, K>
where
    K: Eq + Hash,
{
    pub fn new(upstream: P, key_fn: F) -> Self {
        Self {
            upstream,
            key_fn,
            seen: HashSet::new(),
        }
    }

    /// Clear the dedupe state without discarding the upstream position.
    pub fn reset_state(&mut self) {
        self.seen.clear();
    }
}

impl<P, F, K> PullObj for Dedupe<P, F, K>
where
    P: PullObj,
    F: FnMut(&P::Item) -> K,
    K: Eq + Hash,
{
    type Item = P::Item;

    fn next(&mut self) -> BoxFuture<'_, Option<P::Item>> {
        Box::pin(async move {
            loop {
                let v = self.upstream.next().await?;
                let key = (self.key_fn)(&v);
                if self.seen.insert(key) {
                    return Some(v);
                }
            }
        })
    }

    fn close(&mut self) {
        self.upstream.close();
    }

    fn close_interrupt(&mut self) {
        self.upstream.close_interrupt();
    }

    fn is_done(&self) -> bool {
        self.upstream.is_done()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pull::source::{ArrayDrainOrder, ArraySource};

    #[tokio::test]
    async fn drops_repeats() {
        let src = ArraySource::one_shot(vec![1, 1, 2, 2, 3, 1], ArrayDrainOrder::Fifo);
        let mut d = Dedupe::new(src, |v: &i32| *v);
        assert_eq!(crate::pull::collect(&mut d).await, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn reset_state_clears_seen_set() {
        let src = ArraySource::one_shot(vec![1, 1, 2], ArrayDrainOrder::Fifo);
        let mut d = Dedupe::new(src, |v: &i32| *v);
        assert_eq!(crate::pull::collect(&mut d).await, vec![1, 2]);
        d.upstream = ArraySource::one_shot(vec![1, 1, 2], ArrayDrainOrder::Fifo);
        d.reset_state();
        assert_eq!(crate::pull::collect(&mut d).await, vec![1, 2]);
    }
}
