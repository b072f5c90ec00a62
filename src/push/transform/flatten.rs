use crate::error::CoreError;
use crate::push::{BoxFuture, PushObj};

/// Pass non-iterable values through; for `Vec`-wrapped values, drain and
/// forward each element individually (spec.md §4.2 `flatten`). The
/// source language's duck-typed "pass non-iterables through" is modeled
/// here as a fixed `Vec<T>` input — callers who want pass-through
/// semantics for scalars push single-element vectors.
pub struct Flatten<S> {
    sink: S,
    done: bool,
}

impl<S> Flatten<S> {
    pub fn new(sink: S) -> Self {
        Self { sink, done: false }
    }
}

impl<S> PushObj for Flatten<S>
where
    S: PushObj,
    S::Item: Clone,
{
    type Item = Vec<S::Item>;

    fn next(&mut self, values: Vec<S::Item>) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            if self.done {
                return true;
            }
            for v in values {
                self.done = self.sink.next(v).await;
                if self.done {
                    break;
                }
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

    #[tokio::test]
    async fn drains_each_group() {
        let mut f = Flatten::new(ArrayCollector::new());
        f.next(vec![1, 2, 3]).await;
        f.next(vec![4]).await;
        assert_eq!(f.sink.buffer(), &[1, 2, 3, 4]);
    }
}
