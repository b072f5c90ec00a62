use crate::pull::{BoxFuture, PullObj};

/// Pull one value from every still-active source and emit them together
/// (spec.md §4.1 `zip`). When a source goes done it is dropped from the
/// active set; the round in which it drops still emits whatever the
/// remaining sources produced that round (§8 scenario 2: a trailing
/// length-1 "tuple"); once the active set is empty, `zip` is done.
///
/// A fixed-arity tuple cannot represent the shrinking cardinality this
/// combiner allows, so each item is a `Vec<P::Item>` ordered by the
/// surviving sources' original positions.
pub struct Zip<P> {
    sources: Vec<P>,
    active: Vec<usize>,
}

impl<P: PullObj> Zip<P> {
    pub fn new(sources: Vec<P>) -> Self {
        let active = (0..sources.len()).collect();
        Self { sources, active }
    }
}

impl<P: PullObj> PullObj for Zip<P> {
    type Item = Vec<P::Item>;

    fn next(&mut self) -> BoxFuture<'_, Option<Vec<P::Item>>> {
        Box::pin(async move {
            if self.active.is_empty() {
                return None;
            }
            let mut values = Vec::with_capacity(self.active.len());
            let mut still_active = Vec::with_capacity(self.active.len());
            for &idx in &self.active {
                if let Some(v) = self.sources[idx].next().await {
                    values.push(v);
                    still_active.push(idx);
                }
            }
            self.active = still_active;
            if values.is_empty() { None } else { Some(values) }
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
    async fn shrinks_as_sources_exhaust() {
        let a = ArraySource::one_shot(vec![1, 2, 3, 4], ArrayDrainOrder::Fifo);
        let b = ArraySource::one_shot(vec![10, 20, 30], ArrayDrainOrder::Fifo);
        let mut z = Zip::new(vec![a, b]);
        assert_eq!(z.next().await, Some(vec![1, 10]));
        assert_eq!(z.next().await, Some(vec![2, 20]));
        assert_eq!(z.next().await, Some(vec![3, 30]));
        assert_eq!(z.next().await, Some(vec![4]));
        assert_eq!(z.next().await, None);
        assert!(z.is_done());
    }
}
