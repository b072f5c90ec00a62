use crate::pull::{BoxFuture, PullObj};

/// Rotate through sources, pulling one value per call from whichever
/// source is next in line; exhausted sources are dropped from the
/// rotation (spec.md §4.1 `roundRobin`). Done when all sources are
/// exhausted.
pub struct RoundRobin<P> {
    sources: Vec<P>,
    active: Vec<usize>,
    cursor: usize,
}

impl<P: PullObj> RoundRobin<P> {
    pub fn new(sources: Vec<P>) -> Self {
        let active = (0..sources.len()).collect();
        Self { sources, active, cursor: 0 }
    }
}

impl<P: PullObj> PullObj for RoundRobin<P> {
    type Item = P::Item;

    fn next(&mut self) -> BoxFuture<'_, Option<P::Item>> {
        Box::pin(async move {
            while !self.active.is_empty() {
                if self.cursor >= self.active.len() {
                    self.cursor = 0;
                }
                let idx = self.active[self.cursor];
                match self.sources[idx].next().await {
                    Some(v) => {
                        self.cursor += 1;
                        return Some(v);
                    }
                    None => {
                        self.active.remove(self.cursor);
                        // cursor now already points at the next element
                    }
                }
            }
            None
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
    async fn rotates_then_drops_exhausted() {
        let a = ArraySource::one_shot(vec![1, 3], ArrayDrainOrder::Fifo);
        let b = ArraySource::one_shot(vec![2], ArrayDrainOrder::Fifo);
        let mut r = RoundRobin::new(vec![a, b]);
        assert_eq!(crate::pull::collect(&mut r).await, vec![1, 2, 3]);
        assert!(r.is_done());
    }
}
