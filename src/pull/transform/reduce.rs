use crate::pull::{BoxFuture, PullObj};

/// Fold each value into an accumulator, yielding every intermediate
/// accumulator — a running fold, not a single final value (spec.md §4.1
/// `reduce`). The accumulator is stateful and resets on source swap of a
/// compiled chain, same as [`super::Dedupe`].
pub struct Reduce<P, F, Acc> {
    upstream: P,
    fold: F,
    acc: Acc,
}

impl<P, F, Acc: Clone> Reduce<P, F, Acc> {
    pub fn new(upstream: P, initial: Acc, fold: F) -> Self {
        Self {
            upstream,
            fold,
            acc: initial,
        }
    }

    pub fn reset_state(&mut self, initial: Acc) {
        self.acc = initial;
    }
}

impl<P, F, Acc> PullObj for Reduce<P, F, Acc>
where
    P: PullObj,
    F: FnMut(&Acc, P::Item) -> Acc,
    Acc: Clone,
{
    type Item = Acc;

    fn next(&mut self) -> BoxFuture<'_, Option<Acc>> {
        Box::pin(async move {
            let v = self.upstream.next().await?;
            self.acc = (self.fold)(&self.acc, v);
            Some(self.acc.clone())
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
    async fn running_sum() {
        let src = ArraySource::one_shot(vec![1, 2, 3, 4], ArrayDrainOrder::Fifo);
        let mut r = Reduce::new(src, 0, |acc, v| acc + v);
        assert_eq!(crate::pull::collect(&mut r).await, vec![1, 3, 6, 10]);
    }
}
