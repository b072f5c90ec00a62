//! Pull chain (spec.md §4.3 "Pull chain"): a fluent, consumed-tracking
//! wrapper around a composed [`BoxPull`] pipeline.
//!
//! Every fluent call takes `self` by value and returns a *new*
//! [`PullChain`]; the old chain's shared state is marked consumed so that
//! any other handle still pointing at it (e.g. a clone taken before the
//! call) observes the consumed error rather than silently operating on a
//! pipeline whose pull object has already been moved into the new chain
//! (spec.md §4.3 "the old one is marked consumed", §7 "Consumed chain").

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use crate::error::{CoreError, CoreResult};
use crate::pull::combine::{Concat, RacePull, RaceResult, RoundRobin, Zip};
use crate::pull::transform::{
    AwaitReset, BufferCond, Callback, Dedupe, Eager, Filter, FlatMap, Flatten, InOrder, IntoFlat, Map,
    PullTimeoutObj, Reduce, Window, WindowTimeout,
};
use crate::pull::{BoxPull, Peek, PullObj};
use crate::signal::Wait;

struct Inner<T> {
    pull: Option<BoxPull<T>>,
    consumed: bool,
}

/// Fluent pull chain. See the module docs for the consumed-chain
/// invariant. Cloning shares the same underlying state (spec.md §3
/// "Chain ... immutable builder stage (push) or fluent mutation with
/// consumed-chain marking (pull)").
#[must_use]
pub struct PullChain<T> {
    state: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for PullChain<T> {
    fn clone(&self) -> Self {
        Self { state: self.state.clone() }
    }
}

impl<T: 'static> PullChain<T> {
    /// Wrap an existing pull object as the head of a new chain (spec.md
    /// §4.3 `from(source)`).
    pub fn from_source<P: PullObj<Item = T> + 'static>(source: P) -> Self {
        Self::wrap(Box::new(source))
    }

    fn wrap(pull: BoxPull<T>) -> Self {
        Self {
            state: Rc::new(RefCell::new(Inner { pull: Some(pull), consumed: false })),
        }
    }

    /// Take ownership of the underlying pull object, marking this
    /// chain's shared state (and every clone of it) consumed. Returns an
    /// error if the chain was already consumed.
    fn take(self) -> CoreResult<BoxPull<T>> {
        let mut inner = self.state.borrow_mut();
        if inner.consumed || inner.pull.is_none() {
            return Err(CoreError::ConsumedChain);
        }
        inner.consumed = true;
        Ok(inner.pull.take().unwrap())
    }

    /// Whether this chain (or any clone sharing its state) has already
    /// been consumed by a fluent or dynamic mutation call.
    pub fn is_consumed(&self) -> bool {
        self.state.borrow().consumed
    }

    fn apply<O: 'static>(self, f: impl FnOnce(BoxPull<T>) -> BoxPull<O>) -> CoreResult<PullChain<O>> {
        let pull = self.take()?;
        Ok(PullChain::wrap(f(pull)))
    }

    pub fn map<F, Fut, O>(self, f: F) -> CoreResult<PullChain<O>>
    where
        F: FnMut(T) -> Fut + 'static,
        Fut: Future<Output = O> + 'static,
        O: 'static,
    {
        self.apply(|p| Box::new(Map::new(p, f)))
    }

    pub fn filter<F, Fut>(self, predicate: F) -> CoreResult<PullChain<T>>
    where
        F: FnMut(&T) -> Fut + 'static,
        Fut: Future<Output = bool> + 'static,
    {
        self.apply(|p| Box::new(Filter::new(p, predicate)))
    }

    pub fn dedupe<K, F>(self, key_of: F) -> CoreResult<PullChain<T>>
    where
        K: Eq + std::hash::Hash + 'static,
        F: FnMut(&T) -> K + 'static,
    {
        self.apply(|p| Box::new(Dedupe::new(p, key_of)))
    }

    pub fn reduce<F, A>(self, initial: A, f: F) -> CoreResult<PullChain<A>>
    where
        F: FnMut(A, T) -> A + 'static,
        A: Clone + 'static,
    {
        self.apply(|p| Box::new(Reduce::new(p, initial, f)))
    }

    pub fn window(self, size: usize) -> CoreResult<PullChain<Vec<T>>> {
        self.apply(|p| Box::new(Window::new(p, size)))
    }

    pub fn window_timeout(self, size: usize, timeout: Duration) -> CoreResult<PullChain<Vec<T>>>
    where
        T: 'static,
    {
        self.apply(|p| Box::new(WindowTimeout::new(p, size, timeout)))
    }

    pub fn buffer<F>(self, cond: F) -> CoreResult<PullChain<Vec<T>>>
    where
        F: FnMut(&[T]) -> bool + 'static,
    {
        self.apply(|p| Box::new(BufferCond::new(p, cond)))
    }

    pub fn flatten(self) -> CoreResult<PullChain<<T as IntoFlat>::Out>>
    where
        T: IntoFlat + 'static,
        <T as IntoFlat>::Out: 'static,
    {
        self.apply(|p| Box::new(Flatten::new(p)))
    }

    pub fn flat_map<F, Inner>(self, f: F) -> CoreResult<PullChain<Inner::Item>>
    where
        F: FnMut(T) -> Inner + 'static,
        Inner: PullObj + 'static,
    {
        self.apply(|p| Box::new(FlatMap::new(p, f)))
    }

    pub fn eager(self, n: usize) -> CoreResult<PullChain<T>> {
        self.apply(|p| Box::new(Eager::new(p, n)))
    }

    pub fn callback<F>(self, f: F) -> CoreResult<PullChain<T>>
    where
        F: FnMut(&T) + 'static,
    {
        self.apply(|p| Box::new(Callback::new(p, f)))
    }

    pub fn timeout(self, ms: u64, throw_on_timeout: bool) -> CoreResult<PullChain<T>> {
        self.apply(|p| Box::new(PullTimeoutObj::new(p, Duration::from_millis(ms), throw_on_timeout)))
    }

    pub fn in_order<F>(self, index_of: F) -> CoreResult<PullChain<T>>
    where
        F: FnMut(&T) -> u64 + 'static,
    {
        self.apply(|p| Box::new(InOrder::new(p, index_of)))
    }

    /// Gate drain cycles behind a signal (spec.md §4.1 `awaitReset`).
    ///
    /// Unlike every other fluent method, `awaitReset` cannot be applied to
    /// an already-erased chain: [`Peek`] is only implemented by concrete
    /// buffer-backed sources, and once a pipeline stage is boxed into this
    /// chain's [`BoxPull`] it is type-erased down to plain [`PullObj`] —
    /// the `peek` capability is gone from the vtable (see DESIGN.md "Open
    /// Question: awaitReset vs. chain erasure"). So this is a standalone
    /// constructor taking the concrete `Peek` source directly, rather
    /// than a chain method consuming `self`; it returns a gate handle
    /// alongside the new chain since the boxed `AwaitReset` itself is no
    /// longer reachable to call `.trigger()` on.
    pub fn from_await_reset<P>(source: P) -> (PullChain<P::Item>, Wait<(), ()>)
    where
        P: Peek + 'static,
        P::Item: Clone + 'static,
    {
        let gated = AwaitReset::new(source);
        let handle = gated.handle();
        (PullChain::wrap(Box::new(gated)), handle)
    }

    /// Escape hatch: wrap the current pipeline with a custom user-written
    /// pull object (spec.md §4.3 "pipe").
    pub fn pipe<P, F>(self, factory: F) -> CoreResult<PullChain<P::Item>>
    where
        P: PullObj + 'static,
        F: FnOnce(BoxPull<T>) -> P,
    {
        self.apply(|p| Box::new(factory(p)))
    }

    /// Merge this chain's pipeline with additional sources via `concat`
    /// (spec.md §4.3 "Mid-chain merge methods replace the tail with a
    /// combiner joining the current pipeline with additional sources").
    pub fn concat_with(self, others: Vec<PullChain<T>>) -> CoreResult<PullChain<T>> {
        let mut sources = vec![self.take()?];
        for o in others {
            sources.push(o.take()?);
        }
        Ok(PullChain::wrap(Box::new(Concat::new(sources))))
    }

    pub fn race_with(self, others: Vec<PullChain<T>>) -> CoreResult<PullChain<RaceResult<T>>> {
        let mut sources = vec![self.take()?];
        for o in others {
            sources.push(o.take()?);
        }
        Ok(PullChain::wrap(Box::new(RacePull::new(sources))))
    }

    pub fn round_robin_with(self, others: Vec<PullChain<T>>) -> CoreResult<PullChain<T>> {
        let mut sources = vec![self.take()?];
        for o in others {
            sources.push(o.take()?);
        }
        Ok(PullChain::wrap(Box::new(RoundRobin::new(sources))))
    }

    pub fn zip_with(self, others: Vec<PullChain<T>>) -> CoreResult<PullChain<Vec<T>>> {
        let mut sources = vec![self.take()?];
        for o in others {
            sources.push(o.take()?);
        }
        Ok(PullChain::wrap(Box::new(Zip::new(sources))))
    }

    /// Dynamic mutation limited to item-type-preserving links (spec.md
    /// §4.3 "type information is lost through mutation"): append a new
    /// `T`-to-`T` stage after the current pipeline. True positional
    /// insert/remove into an arbitrary point of a statically-typed
    /// composed pipeline isn't representable without a type-erased
    /// `Any`-keyed link list (see DESIGN.md) — this covers the common
    /// "bolt another same-type stage on" case instead.
    pub fn insert_after<F>(self, build: F) -> CoreResult<PullChain<T>>
    where
        F: FnOnce(BoxPull<T>) -> BoxPull<T>,
    {
        self.apply(build)
    }

    /// Terminal: drain into a `Vec` (spec.md §4.3 `collect`).
    pub async fn collect(self) -> CoreResult<Vec<T>> {
        let mut pull = self.take()?;
        Ok(crate::pull::collect(&mut *pull).await)
    }

    /// Terminal: pull a single value then close (spec.md §4.3 `first`).
    pub async fn first(self) -> CoreResult<Option<T>> {
        let mut pull = self.take()?;
        Ok(crate::pull::first(&mut *pull).await)
    }

    /// Terminal: drive to completion invoking `f` per value (spec.md
    /// §4.3 `forEach`).
    pub async fn for_each<F>(self, f: F) -> CoreResult<()>
    where
        F: FnMut(T),
    {
        let mut pull = self.take()?;
        crate::pull::for_each(&mut *pull, f).await;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pull::source::{ArrayDrainOrder, ArraySource};
    use std::future::ready;

    #[tokio::test]
    async fn filters_then_maps_then_collects() {
        let src = ArraySource::one_shot((1..=10).collect(), ArrayDrainOrder::Fifo);
        let chain = PullChain::from_source(src);
        let out = chain
            .filter(|v: &i32| ready(v % 2 == 0))
            .unwrap()
            .map(|v| ready(v * 3))
            .unwrap()
            .collect()
            .await
            .unwrap();
        assert_eq!(out, vec![6, 12, 18, 24, 30]);
    }

    #[tokio::test]
    async fn consumed_chain_errors() {
        let src = ArraySource::one_shot(vec![1, 2, 3], ArrayDrainOrder::Fifo);
        let chain = PullChain::from_source(src);
        let clone = chain.clone();
        let _next = chain.map(|v| ready(v)).unwrap();
        assert!(clone.is_consumed());
        let err = clone.collect().await.unwrap_err();
        assert!(matches!(err, CoreError::ConsumedChain));
    }

    #[tokio::test]
    async fn flat_map_expands_each_value() {
        let src = ArraySource::one_shot(vec![1, 2], ArrayDrainOrder::Fifo);
        let out = PullChain::from_source(src)
            .flat_map(|v: i32| ArraySource::one_shot(vec![v, v * 10], ArrayDrainOrder::Fifo))
            .unwrap()
            .collect()
            .await
            .unwrap();
        assert_eq!(out, vec![1, 10, 2, 20]);
    }

    #[tokio::test]
    async fn flatten_drains_many_passes_single() {
        use crate::pull::transform::FlattenItem;

        let src = ArraySource::one_shot(
            vec![FlattenItem::Single(1), FlattenItem::Many(vec![2, 3])],
            ArrayDrainOrder::Fifo,
        );
        let out = PullChain::from_source(src).flatten().unwrap().collect().await.unwrap();
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn await_reset_gates_via_cloned_handle() {
        let src = ArraySource::new(vec![1, 2], ArrayDrainOrder::Fifo);
        let (chain, gate) = PullChain::from_await_reset(src);
        gate.resolve(());
        let first = chain.first().await.unwrap();
        assert_eq!(first, Some(1));
    }
}
