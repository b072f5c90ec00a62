use std::time::{Duration, Instant};

use crate::error::CoreError;
use crate::push::{BoxFuture, PushObj};

/// Like [`super::Window`], but also flushes once `duration` has elapsed
/// since the first buffered item (spec.md §4.2 `windowTimeout(n, ms)`).
///
/// Push streams are caller-driven — there is no ambient poll loop the way
/// a pull generator has one — so the elapsed-time check can only run when
/// `next()` is actually called. A window that fills partially and then
/// receives no further pushes will not flush purely from wall-clock time
/// passing; it flushes on the next call that happens to land after the
/// deadline, or on `return_()`. This mirrors the caller-driven nature of
/// push documented in spec.md §5 and is a deliberate simplification
/// (recorded in DESIGN.md) rather than an oversight.
pub struct WindowTimeout<S, T> {
    sink: S,
    size: usize,
    duration: Duration,
    pending: Vec<T>,
    deadline: Option<Instant>,
    done: bool,
}

impl<S, T> WindowTimeout<S, T> {
    pub fn new(sink: S, size: usize, duration: Duration) -> Self {
        assert!(size > 0, "window size must be positive");
        Self {
            sink,
            size,
            duration,
            pending: Vec::with_capacity(size),
            deadline: None,
            done: false,
        }
    }

    fn take_pending(&mut self) -> Vec<T> {
        self.deadline = None;
        std::mem::replace(&mut self.pending, Vec::with_capacity(self.size))
    }
}

impl<S, T> PushObj for WindowTimeout<S, T>
where
    S: PushObj<Item = Vec<T>>,
{
    type Item = T;

    fn next(&mut self, value: T) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            if self.done {
                return true;
            }
            if self.deadline.is_none() {
                self.deadline = Some(Instant::now() + self.duration);
            }
            let expired = self.deadline.is_some_and(|d| Instant::now() >= d);
            self.pending.push(value);
            if self.pending.len() >= self.size || expired {
                let flushed = self.take_pending();
                self.done = self.sink.next(flushed).await;
            }
            self.done
        })
    }

    fn return_(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if !self.pending.is_empty() && !self.done {
                let flushed = self.take_pending();
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
