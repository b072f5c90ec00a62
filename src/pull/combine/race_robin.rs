use std::collections::VecDeque;

use futures_util::future::select_all;

use crate::pull::combine::race::RaceResult;
use crate::pull::{BoxFuture, PullObj};

/// Race within a round, then rotate the winner to the back of the queue
/// so every source gets a fair shot over time (spec.md §4.1 `raceRobin`:
/// "winner rotates to back for fairness"). Done when all sources are
/// exhausted.
pub struct RaceRobin<P> {
    sources: Vec<P>,
    queue: VecDeque<usize>,
}

impl<P: PullObj> RaceRobin<P> {
    pub fn new(sources: Vec<P>) -> Self {
        let queue = (0..sources.len()).collect();
        Self { sources, queue }
    }
}

impl<P: PullObj> PullObj for RaceRobin<P> {
    type Item = RaceResult<P::Item>;

    fn next(&mut self) -> BoxFuture<'_, Option<RaceResult<P::Item>>> {
        Box::pin(async move {
            loop {
                if self.queue.is_empty() {
                    return None;
                }
                let active: Vec<usize> = self.queue.iter().copied().collect();
                let mut futs: Vec<BoxFuture<'_, (usize, Option<P::Item>)>> = Vec::with_capacity(active.len());
                for (idx, src) in self.sources.iter_mut().enumerate() {
                    if active.contains(&idx) {
                        futs.push(Box::pin(async move { (idx, src.next().await) }));
                    }
                }
                let ((idx, value), _, _) = select_all(futs).await;
                // remove the winner from its current slot regardless of
                // outcome; only a successful pull re-enters at the back.
                if let Some(pos) = self.queue.iter().position(|&x| x == idx) {
                    self.queue.remove(pos);
                }
                match value {
                    Some(v) => {
                        self.queue.push_back(idx);
                        return Some(RaceResult { source: idx, value: v });
                    }
                    None => continue,
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
        self.queue.clear();
    }

    fn is_done(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pull::source::{ArrayDrainOrder, ArraySource};

    #[tokio::test]
    async fn rotates_winner_to_back() {
        let a = ArraySource::one_shot(vec![1, 2, 3], ArrayDrainOrder::Fifo);
        let b = ArraySource::one_shot(vec![10], ArrayDrainOrder::Fifo);
        let mut r = RaceRobin::new(vec![a, b]);
        let mut got = crate::pull::collect(&mut r).await;
        got.sort_by_key(|r| r.value);
        assert_eq!(
            got.into_iter().map(|r| r.value).collect::<Vec<_>>(),
            vec![1, 2, 3, 10]
        );
        assert!(r.is_done());
    }
}
