use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// A single-slot promise-sequence wait object (spec.md §3 "Wait object").
///
/// At most one pending consumer is tracked at a time. `resolve` with no
/// pending consumer buffers the value so the next `wait()` sees it
/// immediately without suspending. `reject` is sticky: once an error has
/// been recorded every subsequent `wait()` (even ones that started before
/// the rejection) returns that error, forever.
///
/// Grounded on `xitca-server`'s `worker/limit.rs` `Limit`/`LimitReady`
/// (single `Cell<Option<Waker>>`, woken from `Drop`/state-change sites),
/// generalized from "wake when a counting slot frees up" to "wake with a
/// carried value or a sticky error."
#[derive(Clone)]
pub struct Wait<T = (), E = std::convert::Infallible> {
    inner: Rc<RefCell<Inner<T, E>>>,
}

struct Inner<T, E> {
    buffered: Option<T>,
    error: Option<E>,
    waker: Option<Waker>,
}

impl<T, E> Default for Wait<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Wait<T, E> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                buffered: None,
                error: None,
                waker: None,
            })),
        }
    }

    /// Resolve the wait with a value. If a consumer is currently
    /// suspended in `wait()`, it is woken; otherwise the value is buffered
    /// for the next call. A prior sticky error is never overwritten by a
    /// later resolve (errors are terminal).
    pub fn resolve(&self, value: T) {
        let mut inner = self.inner.borrow_mut();
        if inner.error.is_some() {
            return;
        }
        inner.buffered = Some(value);
        if let Some(waker) = inner.waker.take() {
            waker.wake();
        }
    }

    /// Reject the wait. Sticky: all current and future `wait()` calls
    /// observe this error.
    pub fn reject(&self, err: E) {
        let mut inner = self.inner.borrow_mut();
        if inner.error.is_some() {
            return;
        }
        inner.error = Some(err);
        if let Some(waker) = inner.waker.take() {
            waker.wake();
        }
    }

    /// Await the next resolution, or the sticky error.
    pub fn wait(&self) -> WaitFuture<'_, T, E> {
        WaitFuture { wait: self }
    }
}

pub struct WaitFuture<'a, T, E> {
    wait: &'a Wait<T, E>,
}

impl<T, E> Future for WaitFuture<'_, T, E>
where
    E: Clone,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut inner = self.wait.inner.borrow_mut();
        if let Some(err) = inner.error.clone() {
            return Poll::Ready(Err(err));
        }
        if let Some(value) = inner.buffered.take() {
            return Poll::Ready(Ok(value));
        }
        inner.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn buffers_resolve_with_no_pending_consumer() {
        let wait: Wait<u32, ()> = Wait::new();
        wait.resolve(7);
        assert_eq!(wait.wait().await, Ok(7));
    }

    #[tokio::test]
    async fn reject_is_sticky() {
        let wait: Wait<u32, &'static str> = Wait::new();
        wait.reject("boom");
        assert_eq!(wait.wait().await, Err("boom"));
        wait.resolve(1);
        assert_eq!(wait.wait().await, Err("boom"));
    }

    #[tokio::test]
    async fn wakes_pending_consumer() {
        let wait: Wait<u32, ()> = Wait::new();
        let waiter = wait.wait();
        let resolver = async {
            tokio::task::yield_now().await;
            wait.resolve(42);
        };
        let (res, _) = futures_util::future::join(waiter, resolver).await;
        assert_eq!(res, Ok(42));
    }
}
