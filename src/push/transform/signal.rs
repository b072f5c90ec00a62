use crate::error::CoreError;
use crate::push::{BoxFuture, PushObj};
use crate::signal::wait::Wait;

/// Resolve a [`Wait`] before forwarding each value downstream (spec.md
/// §4.2 `preSignal`).
pub struct PreSignal<S> {
    sink: S,
    wait: Wait<()>,
    done: bool,
}

impl<S> PreSignal<S> {
    pub fn new(sink: S, wait: Wait<()>) -> Self {
        Self { sink, wait, done: false }
    }
}

impl<S: PushObj> PushObj for PreSignal<S> {
    type Item = S::Item;

    fn next(&mut self, value: S::Item) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            if self.done {
                return true;
            }
            self.wait.resolve(());
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

/// Resolve a [`Wait<bool>`] with the `!done` status after forwarding each
/// value downstream (spec.md §4.2 `postSignal`, "post signals the
/// `!done` status").
pub struct PostSignal<S> {
    sink: S,
    wait: Wait<bool>,
    done: bool,
}

impl<S> PostSignal<S> {
    pub fn new(sink: S, wait: Wait<bool>) -> Self {
        Self { sink, wait, done: false }
    }
}

impl<S: PushObj> PushObj for PostSignal<S> {
    type Item = S::Item;

    fn next(&mut self, value: S::Item) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            if self.done {
                return true;
            }
            self.done = self.sink.next(value).await;
            self.wait.resolve(!self.done);
            self.done
        })
    }

    fn return_(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.done = true;
            self.wait.resolve(false);
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
    async fn post_signal_carries_not_done() {
        let wait = Wait::new();
        let mut s = PostSignal::new(ArrayCollector::new(), wait.clone());
        s.next(1).await;
        assert_eq!(wait.wait().await, Ok(true));
    }
}
