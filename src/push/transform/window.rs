use crate::error::CoreError;
use crate::push::{BoxFuture, PushObj};

/// Collect pushed values into fixed-size arrays and forward each full
/// window downstream (spec.md §4.2 `window(n)`). Unlike the pull-side
/// `window`, a push stream has no generator-return channel for a partial
/// trailing window, so `return_()` flushes whatever partial window is
/// pending before propagating the close — otherwise that data would be
/// silently lost (a design decision recorded in DESIGN.md).
pub struct Window<S, T> {
    sink: S,
    size: usize,
    pending: Vec<T>,
    done: bool,
}

impl<S, T> Window<S, T> {
    pub fn new(sink: S, size: usize) -> Self {
        assert!(size > 0, "window size must be positive");
        Self { sink, size, pending: Vec::with_capacity(size), done: false }
    }
}

impl<S, T> PushObj for Window<S, T>
where
    S: PushObj<Item = Vec<T>>,
{
    type Item = T;

    fn next(&mut self, value: T) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            if self.done {
                return true;
            }
            self.pending.push(value);
            if self.pending.len() == self.size {
                let full = std::mem::replace(&mut self.pending, Vec::with_capacity(self.size));
                self.done = self.sink.next(full).await;
            }
            self.done
        })
    }

    fn return_(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if !self.pending.is_empty() && !self.done {
                let partial = std::mem::take(&mut self.pending);
                self.done = self.sink.next(partial).await;
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
    async fn flushes_partial_on_close() {
        let mut w = Window::new(ArrayCollector::new(), 2);
        w.next(1).await;
        w.next(2).await;
        w.next(3).await;
        assert_eq!(w.sink.buffer(), &[vec![1, 2]]);
        w.return_().await;
        assert_eq!(w.sink.buffer(), &[vec![1, 2], vec![3]]);
    }
}
