use std::future::Future;

use crate::pull::{BoxFuture, PullObj};

/// Drop values for which the (sync or async) predicate returns `false`
/// (spec.md §4.1 `filter`).
pub struct Filter<P, F> {
    upstream: P,
    predicate: F,
}

impl<P, F> Filter<P, F> {
    pub fn new(upstream: P, predicate: F) -> Self {
        Self { upstream, predicate }
    }
}

impl<P, F, Fut> PullObj for Filter<P, F>
where
    P: PullObj,
    F: FnMut(&P::Item) -> Fut,
    Fut: Future<Output = bool>,
{
    type Item = P::Item;

    fn next(&mut self) -> BoxFuture<'_, Option<P::Item>> {
        Box::pin(async move {
            loop {
                let v = self.upstream.next().await?;
                if (self.predicate)(&v).await {
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
    use std::future::ready;

    #[tokio::test]
    async fn drops_falsy() {
        let src = ArraySource::one_shot((1..=10).collect(), ArrayDrainOrder::Fifo);
        let mut f = Filter::new(src, |v: &i32| ready(v % 2 == 0));
        assert_eq!(crate::pull::collect(&mut f).await, vec![2, 4, 6, 8, 10]);
    }
}
