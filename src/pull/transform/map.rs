use std::future::Future;

use crate::pull::{BoxFuture, PullObj};

/// Apply a (sync or async) function to each value and yield the result
/// (spec.md §4.1 `map`). Sync functions are accommodated by returning
/// `std::future::ready(..)` from the closure.
pub struct Map<P, F> {
    upstream: P,
    f: F,
}

impl<P, F> Map<P, F> {
    pub fn new(upstream: P, f: F) -> Self {
        Self { upstream, f }
    }
}

impl<P, F, Fut, O> PullObj for Map<P, F>
where
    P: PullObj,
    F: FnMut(P::Item) -> Fut,
    Fut: Future<Output = O>,
{
    type Item = O;

    fn next(&mut self) -> BoxFuture<'_, Option<O>> {
        Box::pin(async move {
            let v = self.upstream.next().await?;
            Some((self.f)(v).await)
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
    async fn maps_each_value() {
        let src = ArraySource::one_shot(vec![1, 2, 3], ArrayDrainOrder::Fifo);
        let mut m = Map::new(src, |v| ready(v * 3));
        assert_eq!(crate::pull::collect(&mut m).await, vec![3, 6, 9]);
    }
}
