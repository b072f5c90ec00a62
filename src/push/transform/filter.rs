use std::future::Future;

use crate::error::CoreError;
use crate::push::{BoxFuture, PushObj};

/// Drop pushed values for which the (sync or async) predicate returns
/// `false`; forward the rest (spec.md §4.2 `filter`).
pub struct Filter<S, F> {
    sink: S,
    predicate: F,
    done: bool,
}

impl<S, F> Filter<S, F> {
    pub fn new(sink: S, predicate: F) -> Self {
        Self { sink, predicate, done: false }
    }
}

impl<S, F, Fut> PushObj for Filter<S, F>
where
    S: PushObj,
    F: FnMut(&S::Item) -> Fut,
    Fut: Future<Output = bool>,
{
    type Item = S::Item;

    fn next(&mut self, value: S::Item) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            if self.done {
                return true;
            }
            if (self.predicate)(&value).await {
                self.done = self.sink.next(value).await;
            }
            self.done
        })
    }

    fn return_(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.done = true;
            self.sink.return_().await;
        })
    }

    fn throw(&mut self, err: CoreError) -> BoxFuture<'_, ()> {
        Box::pin(async move { self.sink.throw(err).await })
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::push::sink::ArrayCollector;
    use std::future::ready;

    #[tokio::test]
    async fn drops_negatives() {
        let mut f = Filter::new(ArrayCollector::new(), |v: &i32| ready(*v > 0));
        for v in [3, -1, 7] {
            f.next(v).await;
        }
        assert_eq!(f.sink.buffer(), &[3, 7]);
    }
}
