use crate::error::CoreError;
use crate::push::{BoxFuture, PushObj};

/// Invoke a side-effect callback before forwarding each value downstream
/// (spec.md §4.2 `preCallback`).
pub struct PreCallback<S, F> {
    sink: S,
    f: F,
    done: bool,
}

impl<S, F> PreCallback<S, F> {
    pub fn new(sink: S, f: F) -> Self {
        Self { sink, f, done: false }
    }
}

impl<S, F> PushObj for PreCallback<S, F>
where
    S: PushObj,
    F: FnMut(&S::Item),
{
    type Item = S::Item;

    fn next(&mut self, value: S::Item) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            if self.done {
                return true;
            }
            (self.f)(&value);
            self.done = self.sink.next(value).await;
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

/// Invoke a side-effect callback after forwarding each value downstream
/// (spec.md §4.2 `postCallback`). The callback receives whether the
/// downstream reported done.
pub struct PostCallback<S, F> {
    sink: S,
    f: F,
    done: bool,
}

impl<S, F> PostCallback<S, F> {
    pub fn new(sink: S, f: F) -> Self {
        Self { sink, f, done: false }
    }
}

impl<S, F> PushObj for PostCallback<S, F>
where
    S: PushObj,
    F: FnMut(bool),
{
    type Item = S::Item;

    fn next(&mut self, value: S::Item) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            if self.done {
                return true;
            }
            self.done = self.sink.next(value).await;
            (self.f)(self.done);
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
    use std::cell::Cell;

    #[tokio::test]
    async fn pre_callback_runs_before_forward() {
        let seen = Cell::new(0);
        let mut c = PreCallback::new(ArrayCollector::new(), |v: &i32| seen.set(*v));
        c.next(5).await;
        assert_eq!(seen.get(), 5);
        assert_eq!(c.sink.buffer(), &[5]);
    }

    #[tokio::test]
    async fn post_callback_sees_done_status() {
        let statuses = std::cell::RefCell::new(Vec::new());
        let mut c = PostCallback::new(ArrayCollector::new(), |done: bool| statuses.borrow_mut().push(done));
        c.next(1).await;
        assert_eq!(*statuses.borrow(), vec![false]);
    }
}
