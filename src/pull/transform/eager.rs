use crate::pull::transform::prefetch::Prefetcher;
use crate::pull::{BoxFuture, PullObj};

/// Pre-fetch up to `n` values concurrently with consumption (spec.md §4.1
/// `eager(n)`). Requires running inside a `tokio::task::LocalSet` since
/// the prefetching is done by a background local task — see
/// [`crate::pull::transform::prefetch`].
pub struct Eager<T> {
    prefetcher: Prefetcher<T>,
    done: bool,
}

impl<T: 'static> Eager<T> {
    pub fn new<P>(upstream: P, n: usize) -> Self
    where
        P: PullObj<Item = T> + 'static,
    {
        Self {
            prefetcher: Prefetcher::spawn(upstream, n),
            done: false,
        }
    }
}

impl<T: 'static> PullObj for Eager<T> {
    type Item = T;

    fn next(&mut self) -> BoxFuture<'_, Option<T>> {
        Box::pin(async move {
            if self.done {
                return None;
            }
            let v = self.prefetcher.recv().await;
            if v.is_none() {
                self.done = true;
            }
            v
        })
    }

    fn close(&mut self) {
        // the background task drains and drops on its own once the
        // channel receiver side is gone; there is no graceful variant for
        // a detached prefetcher beyond letting it finish its current item.
        self.done = true;
    }

    fn close_interrupt(&mut self) {
        self.done = true;
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pull::source::{ArrayDrainOrder, ArraySource};

    #[tokio::test]
    async fn prefetches_and_drains() {
        tokio::task::LocalSet::new()
            .run_until(async {
                let src = ArraySource::one_shot(vec![1, 2, 3], ArrayDrainOrder::Fifo);
                let mut eager = Eager::new(src, 2);
                assert_eq!(crate::pull::collect(&mut eager).await, vec![1, 2, 3]);
            })
            .await;
    }
}
