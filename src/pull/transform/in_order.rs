use std::collections::BTreeMap;

use crate::pull::{BoxFuture, PullObj};

/// Reorder upstream values by an integer index extracted from each value,
/// buffering out-of-order arrivals until their turn comes up (spec.md
/// §4.1 `inOrder`). The next expected index starts at whatever the first
/// observed index is, so callers may start a sequence at any offset.
pub struct InOrder<P: PullObj, F> {
    upstream: P,
    index_of: F,
    next_index: Option<u64>,
    pending: BTreeMap<u64, P::Item>,
}

impl<P: PullObj, F> InOrder<P, F>
where
    F: FnMut(&P::Item) -> u64,
{
    pub fn new(upstream: P, index_of: F) -> Self {
        Self {
            upstream,
            index_of,
            next_index: None,
            pending: BTreeMap::new(),
        }
    }
}

impl<P, F> PullObj for InOrder<P, F>
where
    P: PullObj,
    F: FnMut(&P::Item) -> u64,
{
    type Item = P::Item;

    fn next(&mut self) -> BoxFuture<'_, Option<P::Item>> {
        Box::pin(async move {
            loop {
                if let Some(want) = self.next_index {
                    if let Some(v) = self.pending.remove(&want) {
                        self.next_index = Some(want + 1);
                        return Some(v);
                    }
                }
                match self.upstream.next().await {
                    Some(v) => {
                        let idx = (self.index_of)(&v);
                        if self.next_index.is_none() {
                            self.next_index = Some(idx);
                        }
                        let want = self.next_index.unwrap();
                        if idx == want {
                            self.next_index = Some(want + 1);
                            return Some(v);
                        }
                        self.pending.insert(idx, v);
                    }
                    None => {
                        // drain whatever's left in index order even though
                        // upstream is exhausted.
                        if let Some((_, v)) = self.pending.pop_first() {
                            return Some(v);
                        }
                        return None;
                    }
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
        self.upstream.is_done() && self.pending.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pull::source::{ArrayDrainOrder, ArraySource};

    #[tokio::test]
    async fn reorders_by_index() {
        let src = ArraySource::one_shot(vec![(2, 'c'), (0, 'a'), (1, 'b')], ArrayDrainOrder::Fifo);
        let mut io = InOrder::new(src, |v: &(u64, char)| v.0);
        let out = crate::pull::collect(&mut io).await;
        assert_eq!(out, vec![(0, 'a'), (1, 'b'), (2, 'c')]);
    }
}
