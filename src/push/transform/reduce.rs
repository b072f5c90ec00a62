use crate::error::CoreError;
use crate::push::{BoxFuture, PushObj};

/// Fold each pushed value into an accumulator and forward the running
/// accumulator downstream after every push (spec.md §4.2 "reduce (running
/// accumulator forwarded)").
pub struct Reduce<S: PushObj, F> {
    sink: S,
    f: F,
    acc: S::Item,
    done: bool,
}

impl<S: PushObj, F> Reduce<S, F>
where
    S::Item: Clone,
{
    pub fn new(sink: S, initial: S::Item, f: F) -> Self {
        Self { sink, f, acc: initial, done: false }
    }
}

impl<S, F, I> PushObj for Reduce<S, F>
where
    S: PushObj,
    S::Item: Clone,
    F: FnMut(S::Item, I) -> S::Item,
{
    type Item = I;

    fn next(&mut self, value: I) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            if self.done {
                return true;
            }
            self.acc = (self.f)(self.acc.clone(), value);
            self.done = self.sink.next(self.acc.clone()).await;
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
    async fn forwards_running_fold() {
        let mut r = Reduce::new(ArrayCollector::new(), 0, |acc: i32, v: i32| acc + v);
        for v in [1, 2, 3] {
            r.next(v).await;
        }
        assert_eq!(r.sink.buffer(), &[1, 3, 6]);
    }
}
