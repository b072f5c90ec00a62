use crate::pull::{BoxFuture, PullObj};

/// Exhaust each upstream in order before moving to the next (spec.md §4.1
/// `concat`). Done iff every source is exhausted (§8 "`concat(a,b)` emits
/// a-values then b-values; done iff both done").
pub struct Concat<P> {
    sources: Vec<P>,
    cursor: usize,
}

impl<P: PullObj> Concat<P> {
    pub fn new(sources: Vec<P>) -> Self {
        Self { sources, cursor: 0 }
    }
}

impl<P: PullObj> PullObj for Concat<P> {
    type Item = P::Item;

    fn next(&mut self) -> BoxFuture<'_, Option<P::Item>> {
        Box::pin(async move {
            while self.cursor < self.sources.len() {
                match self.sources[self.cursor].next().await {
                    Some(v) => return Some(v),
                    None => self.cursor += 1,
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
        self.cursor = self.sources.len();
    }

    fn is_done(&self) -> bool {
        self.cursor >= self.sources.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pull::source::{ArrayDrainOrder, ArraySource};

    #[tokio::test]
    async fn emits_a_then_b() {
        let a = ArraySource::one_shot(vec![1, 2], ArrayDrainOrder::Fifo);
        let b = ArraySource::one_shot(vec![3, 4], ArrayDrainOrder::Fifo);
        let mut c = Concat::new(vec![a, b]);
        assert_eq!(crate::pull::collect(&mut c).await, vec![1, 2, 3, 4]);
        assert!(c.is_done());
    }
}
