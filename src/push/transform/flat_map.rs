use crate::error::CoreError;
use crate::push::{BoxFuture, PushObj};

/// Apply a function returning a `Vec` to each pushed value and forward
/// every element before accepting the next push (spec.md §4.2
/// `flatMap`).
pub struct FlatMap<S, F> {
    sink: S,
    f: F,
    done: bool,
}

impl<S, F> FlatMap<S, F> {
    pub fn new(sink: S, f: F) -> Self {
        Self { sink, f, done: false }
    }
}

impl<S, F, I> PushObj for FlatMap<S, F>
where
    S: PushObj,
    F: FnMut(I) -> Vec<S::Item>,
{
    type Item = I;

    fn next(&mut self, value: I) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            if self.done {
                return true;
            }
            for v in (self.f)(value) {
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
    async fn expands_each_push() {
        let mut fm = FlatMap::new(ArrayCollector::new(), |v: i32| vec![v, v * 10]);
        fm.next(1).await;
        fm.next(2).await;
        assert_eq!(fm.sink.buffer(), &[1, 10, 2, 20]);
    }
}
