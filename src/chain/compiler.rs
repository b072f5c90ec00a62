//! Chain compiler (spec.md §4.4): fuses cardinality-preserving operators
//! into a single stream object with no per-stage trait-object dispatch.
//!
//! Rust's static type system turns the "cardinality analysis" of §4.4
//! point 1 into a compile-time fact instead of a runtime scan over a
//! collected descriptor list: [`PullCompileBuilder`] and
//! [`PushCompileBuilder`] only expose the fast-path operators —
//! map/filter/dedupe/reduce/callback for pull (§8 "chain compilation
//! equivalence" names exactly this set), map/filter/reduce/pre-callback
//! for push. A chain that needs a barrier operator (`window`, `flatten`,
//! `flat_map`, `pipe`, `serial`, ...) has no method to call here and
//! stays on [`super::pull::PullChain`] / [`super::push::PushChainBuilder`]
//! — the general path, already implemented as boxed dynamic dispatch
//! (§4.4 point 3). This is "non-fusible barriers... throw at compile
//! time (pull) / degrade to pass-through (push)" enforced by the type
//! checker rather than a runtime `Result::Err`.
//!
//! Every closure accepted below is a plain synchronous function, never
//! one returning a `Future`: §4.4 point 4 documents that "async
//! filter/reduce predicates may not be awaited on the fast path", which
//! this API makes a compile error rather than a silent footgun.

use std::hash::Hash;

use crate::error::CoreError;
use crate::pull::transform::{Callback as PullCallback, Dedupe, Filter as PullFilter, Map as PullMap, Reduce as PullReduce};
use crate::pull::{BoxFuture as PullBoxFuture, BoxPull, PullObj};
use crate::push::{BoxFuture as PushBoxFuture, BoxPush, PushObj};

/// Builder collecting fast-path pull operators (spec.md §4.4 point 1).
/// `S` is the concrete source type the eventual [`CompiledPull`] can have
/// its source swapped to/from (spec.md §4.4 point 5); `T` tracks the
/// current item type as operators are appended.
pub struct PullCompileBuilder<S, T> {
    build: Box<dyn Fn(S) -> BoxPull<T>>,
}

impl<S> PullCompileBuilder<S, S::Item>
where
    S: PullObj + 'static,
{
    /// Start a fast-path recipe directly over a concrete source.
    pub fn new() -> Self {
        Self {
            build: Box::new(|s: S| Box::new(s) as BoxPull<S::Item>),
        }
    }
}

impl<S> Default for PullCompileBuilder<S, S::Item>
where
    S: PullObj + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S: 'static, T: 'static> PullCompileBuilder<S, T> {
    pub fn map<F, O>(self, f: F) -> PullCompileBuilder<S, O>
    where
        F: FnMut(T) -> O + Clone + 'static,
        O: 'static,
    {
        let build = self.build;
        PullCompileBuilder {
            build: Box::new(move |s| {
                let f = f.clone();
                let mut f = f;
                Box::new(PullMap::new(build(s), move |v: T| std::future::ready(f(v))))
            }),
        }
    }

    pub fn filter<F>(self, predicate: F) -> PullCompileBuilder<S, T>
    where
        F: FnMut(&T) -> bool + Clone + 'static,
    {
        let build = self.build;
        PullCompileBuilder {
            build: Box::new(move |s| {
                let mut predicate = predicate.clone();
                Box::new(PullFilter::new(build(s), move |v: &T| std::future::ready(predicate(v))))
            }),
        }
    }

    pub fn dedupe<F, K>(self, key_of: F) -> PullCompileBuilder<S, T>
    where
        F: FnMut(&T) -> K + Clone + 'static,
        K: Eq + Hash + 'static,
    {
        let build = self.build;
        PullCompileBuilder {
            build: Box::new(move |s| Box::new(Dedupe::new(build(s), key_of.clone()))),
        }
    }

    pub fn reduce<F, Acc>(self, initial: Acc, fold: F) -> PullCompileBuilder<S, Acc>
    where
        F: FnMut(&Acc, T) -> Acc + Clone + 'static,
        Acc: Clone + 'static,
    {
        let build = self.build;
        PullCompileBuilder {
            build: Box::new(move |s| Box::new(PullReduce::new(build(s), initial.clone(), fold.clone()))),
        }
    }

    pub fn callback<F>(self, f: F) -> PullCompileBuilder<S, T>
    where
        F: FnMut(&T) + Clone + 'static,
    {
        let build = self.build;
        PullCompileBuilder {
            build: Box::new(move |s| Box::new(PullCallback::new(build(s), f.clone()))),
        }
    }

    /// Terminal: materialize against a concrete source, keeping the
    /// recipe around so [`CompiledPull::set_source`] can rebuild the
    /// whole fused pipeline from scratch (spec.md §4.4 point 5: swapping
    /// the source "resets all stateful operators ... and recreates the
    /// fused generator").
    pub fn compile(self, source: S) -> CompiledPull<S, T> {
        let build = self.build;
        let current = build(source);
        CompiledPull { current, build }
    }
}

/// A fused pull pipeline (spec.md §4.4 "Compiled chain"). `next`/`close`
/// delegate straight to the currently-materialized object; the only
/// extra surface is [`CompiledPull::set_source`], which rebuilds every
/// stage from scratch against the new source, discarding whatever
/// `dedupe`/`reduce` state had accumulated.
pub struct CompiledPull<S, T> {
    current: BoxPull<T>,
    build: Box<dyn Fn(S) -> BoxPull<T>>,
}

impl<S, T> CompiledPull<S, T> {
    /// Swap the source, resetting every stateful fast-path operator
    /// (spec.md §4.4 point 5, tested in §8 "Swapping the source of a
    /// compiled chain resets stateful operators").
    pub fn set_source(&mut self, source: S) {
        self.current = (self.build)(source);
    }
}

impl<S, T> PullObj for CompiledPull<S, T> {
    type Item = T;

    fn next(&mut self) -> PullBoxFuture<'_, Option<T>> {
        self.current.next()
    }

    fn close(&mut self) {
        self.current.close();
    }

    fn close_interrupt(&mut self) {
        self.current.close_interrupt();
    }

    fn is_done(&self) -> bool {
        self.current.is_done()
    }
}

/// Outcome of one fast-path push fusion step: a value to forward, or a
/// dropped (filtered) value that forwards nothing (spec.md §4.4 "Filter/
/// dedupe use a labeled skip (no intermediate allocation)").
enum PushStep<O> {
    Emit(O),
    Skip,
}

/// Builder collecting fast-path push operators. Unlike the pull side,
/// push compilation needs no recipe/rebuild machinery: spec.md §4.4
/// point 5 says swapping a push chain's sink "redirects output without
/// reset", so [`CompiledPush::set_sink`] is a plain field replacement.
///
/// `postCallback` (observing the downstream's async `done` result) is
/// deliberately not offered here: it needs the outcome of the sink's
/// `next().await`, which only exists after the fused synchronous
/// function has already run, so it stays a general-path-only operator
/// (see [`crate::push::transform::PostCallback`]).
pub struct PushCompileBuilder<In, Out> {
    fuse: Box<dyn FnMut(In) -> PushStep<Out>>,
}

impl<Out: 'static> PushCompileBuilder<Out, Out> {
    pub fn new() -> Self {
        Self { fuse: Box::new(PushStep::Emit) }
    }
}

impl<Out: 'static> Default for PushCompileBuilder<Out, Out> {
    fn default() -> Self {
        Self::new()
    }
}

impl<In: 'static, Out: 'static> PushCompileBuilder<In, Out> {
    pub fn map<F, NewIn>(self, mut f: F) -> PushCompileBuilder<NewIn, Out>
    where
        F: FnMut(NewIn) -> In + 'static,
        NewIn: 'static,
    {
        let mut fuse = self.fuse;
        PushCompileBuilder {
            fuse: Box::new(move |v: NewIn| fuse(f(v))),
        }
    }

    pub fn filter<F>(self, mut predicate: F) -> PushCompileBuilder<In, Out>
    where
        F: FnMut(&In) -> bool + 'static,
    {
        let mut fuse = self.fuse;
        PushCompileBuilder {
            fuse: Box::new(move |v: In| if predicate(&v) { fuse(v) } else { PushStep::Skip }),
        }
    }

    pub fn reduce<F, NewIn>(self, initial: In, mut f: F) -> PushCompileBuilder<NewIn, Out>
    where
        In: Clone + 'static,
        F: FnMut(In, NewIn) -> In + 'static,
        NewIn: 'static,
    {
        let mut fuse = self.fuse;
        let mut acc = initial;
        PushCompileBuilder {
            fuse: Box::new(move |v: NewIn| {
                acc = f(acc.clone(), v);
                fuse(acc.clone())
            }),
        }
    }

    pub fn tap<F>(self, mut f: F) -> PushCompileBuilder<In, Out>
    where
        F: FnMut(&In) + 'static,
    {
        let mut fuse = self.fuse;
        PushCompileBuilder {
            fuse: Box::new(move |v: In| {
                f(&v);
                fuse(v)
            }),
        }
    }

    /// Terminal: materialize against a concrete sink.
    pub fn compile<Snk>(self, sink: Snk) -> CompiledPush<In, Out>
    where
        Snk: PushObj<Item = Out> + 'static,
    {
        CompiledPush { fuse: self.fuse, sink: Box::new(sink) }
    }
}

/// A fused push pipeline. Sink swap (`set_sink`) never resets the fused
/// closures' internal state (e.g. a compiled `reduce`'s running
/// accumulator survives a sink swap) — only the pull side resets on
/// swap, per spec.md §4.4 point 5.
pub struct CompiledPush<In, Out> {
    fuse: Box<dyn FnMut(In) -> PushStep<Out>>,
    sink: BoxPush<Out>,
}

impl<In, Out> CompiledPush<In, Out> {
    pub fn set_sink(&mut self, sink: BoxPush<Out>) {
        self.sink = sink;
    }
}

impl<In: 'static, Out: 'static> PushObj for CompiledPush<In, Out> {
    type Item = In;

    fn next(&mut self, value: In) -> PushBoxFuture<'_, bool> {
        match (self.fuse)(value) {
            PushStep::Emit(out) => self.sink.next(out),
            PushStep::Skip => Box::pin(std::future::ready(false)),
        }
    }

    fn return_(&mut self) -> PushBoxFuture<'_, ()> {
        self.sink.return_()
    }

    fn throw(&mut self, err: CoreError) -> PushBoxFuture<'_, ()> {
        self.sink.throw(err)
    }

    fn is_done(&self) -> bool {
        self.sink.is_done()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pull::source::{ArrayDrainOrder, ArraySource};
    use crate::push::sink::ArrayCollector;
    use crate::push::BoxFuture as PushBoxFuture2;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Test-only adapter routing pushes into a shared, externally
    /// readable [`ArrayCollector`] — needed because [`CompiledPush`]
    /// stores its sink boxed, so assertions can't reach a concrete
    /// `ArrayCollector` field directly (same pattern as
    /// `chain::push::SharedArrayCollector`).
    struct SharedCollector<T>(Rc<RefCell<ArrayCollector<T>>>);

    impl<T: 'static> PushObj for SharedCollector<T> {
        type Item = T;

        fn next(&mut self, value: T) -> PushBoxFuture2<'_, bool> {
            let cell = self.0.clone();
            Box::pin(async move { cell.borrow_mut().next(value).await })
        }

        fn return_(&mut self) -> PushBoxFuture2<'_, ()> {
            let cell = self.0.clone();
            Box::pin(async move { cell.borrow_mut().return_().await })
        }

        fn throw(&mut self, err: CoreError) -> PushBoxFuture2<'_, ()> {
            let cell = self.0.clone();
            Box::pin(async move { cell.borrow_mut().throw(err).await })
        }

        fn is_done(&self) -> bool {
            self.0.borrow().is_done()
        }
    }

    #[tokio::test]
    async fn fast_path_matches_uncompiled_map_filter() {
        let src = ArraySource::one_shot((1..=10).collect(), ArrayDrainOrder::Fifo);
        let mut compiled = PullCompileBuilder::<ArraySource<i32>, i32>::new()
            .filter(|v: &i32| v % 2 == 0)
            .map(|v| v * 3)
            .compile(src);
        assert_eq!(crate::pull::collect(&mut compiled).await, vec![6, 12, 18, 24, 30]);
    }

    #[tokio::test]
    async fn compile_and_swap_resets_dedupe_state() {
        let src = ArraySource::one_shot(vec![1, 1, 2], ArrayDrainOrder::Fifo);
        let mut compiled = PullCompileBuilder::<ArraySource<i32>, i32>::new()
            .dedupe(|v: &i32| *v)
            .compile(src);
        assert_eq!(crate::pull::collect(&mut compiled).await, vec![1, 2]);

        compiled.set_source(ArraySource::one_shot(vec![1, 1, 2], ArrayDrainOrder::Fifo));
        assert_eq!(crate::pull::collect(&mut compiled).await, vec![1, 2]);
    }

    #[tokio::test]
    async fn compile_and_swap_plain_map_source() {
        let src = ArraySource::one_shot(vec![1, 2, 3], ArrayDrainOrder::Fifo);
        let mut compiled = PullCompileBuilder::<ArraySource<i32>, i32>::new().map(|v| v * 10).compile(src);
        assert_eq!(crate::pull::collect(&mut compiled).await, vec![10, 20, 30]);

        compiled.set_source(ArraySource::one_shot(vec![4, 5], ArrayDrainOrder::Fifo));
        assert_eq!(crate::pull::collect(&mut compiled).await, vec![40, 50]);
    }

    #[tokio::test]
    async fn push_fast_path_maps_and_filters() {
        let shared = Rc::new(RefCell::new(ArrayCollector::new()));
        let mut compiled = PushCompileBuilder::<i32, i32>::new()
            .filter(|v: &i32| *v > 0)
            .map(|v: i32| v * 2)
            .compile(SharedCollector(shared.clone()));
        for v in [3, -1, 7] {
            compiled.next(v).await;
        }
        assert_eq!(shared.borrow().buffer(), &[6, 14]);
    }

    #[tokio::test]
    async fn push_sink_swap_preserves_reduce_state() {
        let first = Rc::new(RefCell::new(ArrayCollector::new()));
        let second = Rc::new(RefCell::new(ArrayCollector::new()));
        let mut compiled = PushCompileBuilder::<i32, i32>::new()
            .reduce(0, |acc: i32, v: i32| acc + v)
            .compile(SharedCollector(first.clone()));
        compiled.next(1).await;
        compiled.next(2).await;
        compiled.set_sink(Box::new(SharedCollector(second.clone())));
        compiled.next(3).await;
        // the accumulator (1, 3, 6) survives the sink swap even though
        // the swapped-in sink only observes the post-swap push.
        assert_eq!(first.borrow().buffer(), &[1, 3]);
        assert_eq!(second.borrow().buffer(), &[6]);
    }
}
