use crate::error::CoreError;
use crate::push::{BoxFuture, PushObj};

/// Collect pushed values until `cond` returns true, then flush the whole
/// batch downstream (spec.md §4.2 `buffer(cond)`). As with
/// [`super::Window`], a trailing buffer that never satisfies `cond` is
/// flushed on `return_()` rather than dropped, since push has no
/// generator-return channel to carry it out of band.
pub struct BufferCond<S, T, F> {
    sink: S,
    cond: F,
    pending: Vec<T>,
    done: bool,
}

impl<S, T, F> BufferCond<S, T, F> {
    pub fn new(sink: S, cond: F) -> Self {
        Self { sink, cond, pending: Vec::new(), done: false }
    }
}

impl<S, T, F> PushObj for BufferCond<S, T, F>
where
    S: PushObj<Item = Vec<T>>,
    F: FnMut(&[T]) -> bool,
{
    type Item = T;

    fn next(&mut self, value: T) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            if self.done {
                return true;
            }
            self.pending.push(value);
            if (self.cond)(&self.pending) {
                let flushed = std::mem::take(&mut self.pending);
                self.done = self.sink.next(flushed).await;
            }
            self.done
        })
    }

    fn return_(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if !self.pending.is_empty() && !self.done {
                let flushed = std::mem::take(&mut self.pending);
                self.done = self.sink.next(flushed).await;
            }
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
    async fn flushes_when_condition_met() {
        let mut b = BufferCond::new(ArrayCollector::new(), |batch: &[i32]| batch.iter().sum::<i32>() >= 5);
        b.next(2).await;
        b.next(2).await;
        assert!(b.sink.buffer().is_empty());
        b.next(3).await;
        assert_eq!(b.sink.buffer(), &[vec![2, 2, 3]]);
    }
}
