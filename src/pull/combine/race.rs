use futures_util::future::select_all;

use crate::pull::{BoxFuture, PullObj};

/// Envelope yielded by [`RacePull`]: which source produced the value that
/// won this round (spec.md §8 "`race(a,b)` emits from whoever resolves
/// first").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceResult<T> {
    pub source: usize,
    pub value: T,
}

/// Pull all sources concurrently and yield from whichever resolves first
/// (spec.md §4.1 `race`). Done once every source is exhausted. Losing
/// futures from a round are dropped rather than kept alive across rounds
/// — acceptable because `next()` on the provided `PullObj`s is expected
/// to be re-callable, and nothing in §4.1 promises an in-flight loser
/// survives past the round it lost.
pub struct RacePull<P> {
    sources: Vec<P>,
    active: Vec<usize>,
}

impl<P: PullObj> RacePull<P> {
    pub fn new(sources: Vec<P>) -> Self {
        let active = (0..sources.len()).collect();
        Self { sources, active }
    }
}

impl<P: PullObj> PullObj for RacePull<P> {
    type Item = RaceResult<P::Item>;

    fn next(&mut self) -> BoxFuture<'_, Option<RaceResult<P::Item>>> {
        Box::pin(async move {
            loop {
                if self.active.is_empty() {
                    return None;
                }
                let active = self.active.clone();
                let mut futs: Vec<BoxFuture<'_, (usize, Option<P::Item>)>> = Vec::with_capacity(active.len());
                for (idx, src) in self.sources.iter_mut().enumerate() {
                    if active.contains(&idx) {
                        futs.push(Box::pin(async move { (idx, src.next().await) }));
                    }
                }
                let ((idx, value), _, _) = select_all(futs).await;
                match value {
                    Some(v) => return Some(RaceResult { source: idx, value: v }),
                    None => self.active.retain(|&x| x != idx),
                }
            }
        })
    }

    fn close(&mut self) {
        for s in &mut self.sources {
            s.close();
        }
    }

    fn close_interrupt(&mut self) {
        for s in &mut self.sources {
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
    async fn all_values_eventually_surface() {
        let a = ArraySource::one_shot(vec![1, 2], ArrayDrainOrder::Fifo);
        let b = ArraySource::one_shot(vec![10, 20], ArrayDrainOrder::Fifo);
        let mut r = RacePull::new(vec![a, b]);
        let mut got = crate::pull::collect(&mut r).await;
        got.sort_by_key(|r| r.value);
        assert_eq!(
            got.into_iter().map(|r| r.value).collect::<Vec<_>>(),
            vec![1, 2, 10, 20]
        );
        assert!(r.is_done());
    }
}
