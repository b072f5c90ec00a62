use std::future::Future;

use crate::error::CoreError;
use crate::push::{BoxFuture, PushObj};

/// Apply a (sync or async) function to each pushed value and forward the
/// result downstream (spec.md §4.2 `map`).
pub struct Map<S, F> {
    sink: S,
    f: F,
    done: bool,
}

impl<S, F> Map<S, F> {
    pub fn new(sink: S, f: F) -> Self {
        Self { sink, f, done: false }
    }
}

impl<S, F, Fut, I> PushObj for Map<S, F>
where
    S: PushObj,
    F: FnMut(I) -> Fut,
    Fut: Future<Output = S::Item>,
{
    type Item = I;

    fn next(&mut self, value: I) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            if self.done {
                return true;
            }
            let mapped = (self.f)(value).await;
            self.done = self.sink.next(mapped).await;
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
    async fn maps_then_forwards() {
        let mut m = Map::new(ArrayCollector::new(), |v: i32| ready(v * 2));
        m.next(1).await;
        m.next(2).await;
        assert_eq!(m.sink.buffer(), &[2, 4]);
    }
}
