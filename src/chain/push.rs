//! Push chain builder (spec.md §4.3 "Push chain builder"): an immutable
//! recipe of operations that materializes backwards from a concrete
//! terminal sink.
//!
//! Every fluent call returns a *new* builder wrapping a continuation —
//! `build: FnOnce(BoxPush<Out>) -> BoxPush<In>` — rather than mutating
//! anything in place. Nothing is actually constructed until a terminal
//! method supplies the real downstream sink, at which point the whole
//! chain of closures unwinds back-to-front, each stage wrapping the one
//! built before it (spec.md §4.3 "each object needs its downstream
//! reference at construction").

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::rc::Rc;

use crate::error::CoreError;
use crate::push::distribute::{Distribute, LabeledDistribute, PushForkObj, PushRoundRobin};
use crate::push::sink::{ArrayCollector, CallbackSink};
use crate::push::transform::{
    BufferCond, Filter, FlatMap, Flatten, Map, PostCallback, PostSignal, PreCallback, PreSignal, Reduce,
    Serial, Window, WindowTimeout,
};
use crate::push::{BoxFuture, BoxPush, PushObj};
use crate::signal::Wait;

/// Immutable recipe under construction. `In` is the item type the head of
/// the eventual pipeline will accept; `Out` is the item type the terminal
/// sink (not yet chosen) must accept.
#[must_use]
pub struct PushChainBuilder<In, Out> {
    build: Box<dyn FnOnce(BoxPush<Out>) -> BoxPush<In>>,
}

impl<Out: 'static> PushChainBuilder<Out, Out> {
    /// Start a new recipe: the identity continuation (spec.md §4.3
    /// "every fluent call returns a new builder with the appended
    /// operation" — starting from none).
    pub fn new() -> Self {
        Self { build: Box::new(|sink| sink) }
    }
}

impl<Out: 'static> Default for PushChainBuilder<Out, Out> {
    fn default() -> Self {
        Self::new()
    }
}

impl<In: 'static, Out: 'static> PushChainBuilder<In, Out> {
    /// Escape hatch: wrap the pipeline built so far with a custom
    /// user-written push object (spec.md §4.3 "pipe").
    pub fn pipe<P, F>(self, factory: F) -> PushChainBuilder<P::Item, Out>
    where
        P: PushObj + 'static,
        F: FnOnce(BoxPush<In>) -> P + 'static,
    {
        PushChainBuilder {
            build: Box::new(move |out_sink| {
                let head = (self.build)(out_sink);
                Box::new(factory(head))
            }),
        }
    }

    pub fn map<F, Fut, NewIn>(self, f: F) -> PushChainBuilder<NewIn, Out>
    where
        F: FnMut(NewIn) -> Fut + 'static,
        Fut: Future<Output = In> + 'static,
        NewIn: 'static,
    {
        PushChainBuilder {
            build: Box::new(move |out_sink| {
                let head = (self.build)(out_sink);
                Box::new(Map::new(head, f))
            }),
        }
    }

    pub fn filter<F, Fut>(self, predicate: F) -> PushChainBuilder<In, Out>
    where
        F: FnMut(&In) -> Fut + 'static,
        Fut: Future<Output = bool> + 'static,
    {
        PushChainBuilder {
            build: Box::new(move |out_sink| {
                let head = (self.build)(out_sink);
                Box::new(Filter::new(head, predicate))
            }),
        }
    }

    pub fn reduce<F, NewIn>(self, initial: In, f: F) -> PushChainBuilder<NewIn, Out>
    where
        In: Clone + 'static,
        F: FnMut(In, NewIn) -> In + 'static,
        NewIn: 'static,
    {
        PushChainBuilder {
            build: Box::new(move |out_sink| {
                let head = (self.build)(out_sink);
                Box::new(Reduce::new(head, initial, f))
            }),
        }
    }

    pub fn flat_map<F, NewIn>(self, f: F) -> PushChainBuilder<NewIn, Out>
    where
        F: FnMut(NewIn) -> Vec<In> + 'static,
        NewIn: 'static,
    {
        PushChainBuilder {
            build: Box::new(move |out_sink| {
                let head = (self.build)(out_sink);
                Box::new(FlatMap::new(head, f))
            }),
        }
    }

    /// Batch each pushed `Vec<In>` element-by-element into the existing
    /// pipeline (spec.md §4.2 `flatten`).
    pub fn flatten(self) -> PushChainBuilder<Vec<In>, Out>
    where
        In: Clone + 'static,
    {
        PushChainBuilder {
            build: Box::new(move |out_sink| {
                let head = (self.build)(out_sink);
                Box::new(Flatten::new(head))
            }),
        }
    }

    /// Side-effect before forwarding (spec.md §4.2 `preCallback`).
    pub fn tap<F>(self, f: F) -> PushChainBuilder<In, Out>
    where
        F: FnMut(&In) + 'static,
    {
        PushChainBuilder {
            build: Box::new(move |out_sink| {
                let head = (self.build)(out_sink);
                Box::new(PreCallback::new(head, f))
            }),
        }
    }

    /// Side-effect after forwarding, observing the downstream done status
    /// (spec.md §4.2 `postCallback`).
    pub fn tap_done<F>(self, f: F) -> PushChainBuilder<In, Out>
    where
        F: FnMut(bool) + 'static,
    {
        PushChainBuilder {
            build: Box::new(move |out_sink| {
                let head = (self.build)(out_sink);
                Box::new(PostCallback::new(head, f))
            }),
        }
    }

    /// Resolve `wait` before forwarding each value (spec.md §4.2
    /// `preSignal`).
    pub fn pre_signal(self, wait: Wait<()>) -> PushChainBuilder<In, Out> {
        PushChainBuilder {
            build: Box::new(move |out_sink| {
                let head = (self.build)(out_sink);
                Box::new(PreSignal::new(head, wait))
            }),
        }
    }

    /// Resolve `wait` with `!done` after forwarding each value (spec.md
    /// §4.2 `postSignal`).
    pub fn post_signal(self, wait: Wait<bool>) -> PushChainBuilder<In, Out> {
        PushChainBuilder {
            build: Box::new(move |out_sink| {
                let head = (self.build)(out_sink);
                Box::new(PostSignal::new(head, wait))
            }),
        }
    }

    /// Serialize concurrent pushes into the pipeline built so far
    /// (spec.md §4.2 `serial`). Used through `&mut self` here, `Serial`
    /// is a passthrough; the cross-task ordering guarantee is obtained
    /// by calling [`crate::push::transform::Serial::into_handle`] on the
    /// materialized result if concurrent callers are expected.
    pub fn serial(self) -> PushChainBuilder<In, Out> {
        PushChainBuilder {
            build: Box::new(move |out_sink| {
                let head = (self.build)(out_sink);
                Box::new(Serial::new(head))
            }),
        }
    }

    /// Terminal: materialize into a caller-supplied sink (spec.md §4.3
    /// `into`).
    pub fn into_sink<S: PushObj<Item = Out> + 'static>(self, sink: S) -> PushChain<In> {
        PushChain::new((self.build)(Box::new(sink)))
    }

    /// Terminal: materialize into a fresh array collector, returning a
    /// handle that can read the buffer back out (spec.md §4.3 `toArray`).
    pub fn to_array(self) -> (PushChain<In>, ArrayCollectorHandle<Out>) {
        let shared = Rc::new(RefCell::new(ArrayCollector::new()));
        let handle = ArrayCollectorHandle(shared.clone());
        let sink: Box<dyn PushObj<Item = Out>> = Box::new(SharedArrayCollector(shared));
        (PushChain::new((self.build)(sink)), handle)
    }

    /// Terminal: materialize into a callback array (spec.md §4.3
    /// `toCallbacks`).
    pub fn to_callbacks(self, callbacks: Vec<Box<dyn FnMut(&Out) + Send>>) -> PushChain<In> {
        let mut sink = CallbackSink::new();
        sink.set_callbacks(callbacks);
        PushChain::new((self.build)(Box::new(sink)))
    }

    /// Terminal: broadcast to every sink (spec.md §4.3 `fork`).
    pub fn fork(self, sinks: Vec<BoxPush<Out>>) -> PushChain<In>
    where
        Out: Clone,
    {
        PushChain::new((self.build)(Box::new(PushForkObj::new(sinks))))
    }

    /// Terminal: route by selector (spec.md §4.3 `distribute`).
    pub fn distribute<F>(self, sinks: Vec<BoxPush<Out>>, selector: F) -> PushChain<In>
    where
        F: FnMut(&Out) -> usize + 'static,
    {
        PushChain::new((self.build)(Box::new(Distribute::new(sinks, selector))))
    }

    /// Terminal: route by label (spec.md §4.3 `distribute`,
    /// `labeledDistribute`).
    pub fn labeled_distribute<L, F>(
        self,
        sinks: HashMap<L, BoxPush<Out>>,
        key_of: F,
        throw_on_nonexistence: bool,
    ) -> PushChain<In>
    where
        L: Eq + Hash + Clone + Debug + 'static,
        F: FnMut(&Out) -> L + 'static,
    {
        PushChain::new((self.build)(Box::new(LabeledDistribute::new(sinks, key_of, throw_on_nonexistence))))
    }

    /// Terminal: rotate across sinks (spec.md §4.3 `roundRobinTo`).
    pub fn round_robin_to(self, sinks: Vec<BoxPush<Out>>) -> PushChain<In> {
        PushChain::new((self.build)(Box::new(PushRoundRobin::new(sinks))))
    }
}

/// Specialized operations only available once the builder's current head
/// accepts batches: windowing groups individual `T` pushes into `Vec<T>`
/// before handing them to whatever accepts `Vec<T>` (spec.md §4.2
/// `window`, `windowTimeout`, `buffer`). Expressed as a dedicated `impl`
/// for `PushChainBuilder<Vec<T>, Out>` rather than a trait bound on `In`,
/// since Rust has no way to say "In == Vec<T> for some T" inline.
impl<T: 'static, Out: 'static> PushChainBuilder<Vec<T>, Out> {
    pub fn window(self, size: usize) -> PushChainBuilder<T, Out> {
        PushChainBuilder {
            build: Box::new(move |out_sink| {
                let head = (self.build)(out_sink);
                Box::new(Window::new(head, size))
            }),
        }
    }

    pub fn window_timeout(self, size: usize, duration: std::time::Duration) -> PushChainBuilder<T, Out> {
        PushChainBuilder {
            build: Box::new(move |out_sink| {
                let head = (self.build)(out_sink);
                Box::new(WindowTimeout::new(head, size, duration))
            }),
        }
    }

    pub fn buffer<F>(self, cond: F) -> PushChainBuilder<T, Out>
    where
        F: FnMut(&[T]) -> bool + 'static,
    {
        PushChainBuilder {
            build: Box::new(move |out_sink| {
                let head = (self.build)(out_sink);
                Box::new(BufferCond::new(head, cond))
            }),
        }
    }
}

/// Thin adapter routing a push into a shared, externally-readable
/// [`ArrayCollector`] (spec.md §4.3 "toArray"; the handle returned
/// alongside lets the caller inspect/drain the buffer after
/// materialization, which an owned, boxed-away collector couldn't offer).
struct SharedArrayCollector<T>(Rc<RefCell<ArrayCollector<T>>>);

impl<T: 'static> PushObj for SharedArrayCollector<T> {
    type Item = T;

    fn next(&mut self, value: T) -> BoxFuture<'_, bool> {
        let cell = self.0.clone();
        Box::pin(async move { cell.borrow_mut().next(value).await })
    }

    fn return_(&mut self) -> BoxFuture<'_, ()> {
        let cell = self.0.clone();
        Box::pin(async move { cell.borrow_mut().return_().await })
    }

    fn throw(&mut self, err: CoreError) -> BoxFuture<'_, ()> {
        let cell = self.0.clone();
        Box::pin(async move { cell.borrow_mut().throw(err).await })
    }

    fn is_done(&self) -> bool {
        self.0.borrow().is_done()
    }
}

/// Read/drain access to a [`PushChainBuilder::to_array`] terminal's
/// buffer, independent of the materialized [`PushChain`] itself.
pub struct ArrayCollectorHandle<T>(Rc<RefCell<ArrayCollector<T>>>);

impl<T: Clone> ArrayCollectorHandle<T> {
    pub fn snapshot(&self) -> Vec<T> {
        self.0.borrow().buffer().to_vec()
    }
}

impl<T> ArrayCollectorHandle<T> {
    pub fn drain(&self) -> Vec<T> {
        self.0.borrow_mut().drain()
    }
}

struct PushState<T> {
    push: Option<BoxPush<T>>,
}

/// A materialized push pipeline (spec.md §4.3 "The resulting `PushChain`
/// exposes `head`, `tail`, `links`, and in-place mutation"). Rust's
/// static typing can't give arbitrary positional insert/remove/replace
/// into a type-erased `BoxPush<T>` any more than the pull chain can (see
/// DESIGN.md); [`PushChain::insert_after`] covers the same-item-type
/// "bolt another stage onto the head" case, rewiring the stored object in
/// place exactly as the spec's "rewires sink references automatically"
/// describes for that one case.
#[must_use]
pub struct PushChain<T> {
    state: Rc<RefCell<PushState<T>>>,
}

impl<T: 'static> PushChain<T> {
    fn new(push: BoxPush<T>) -> Self {
        Self { state: Rc::new(RefCell::new(PushState { push: Some(push) })) }
    }

    pub async fn push(&self, value: T) -> bool {
        let mut head = self.state.borrow_mut().push.take().expect("push chain head missing");
        let done = head.next(value).await;
        self.state.borrow_mut().push = Some(head);
        done
    }

    pub async fn return_(&self) {
        let mut head = self.state.borrow_mut().push.take().expect("push chain head missing");
        head.return_().await;
        self.state.borrow_mut().push = Some(head);
    }

    pub async fn throw(&self, err: CoreError) {
        let mut head = self.state.borrow_mut().push.take().expect("push chain head missing");
        head.throw(err).await;
        self.state.borrow_mut().push = Some(head);
    }

    pub fn is_done(&self) -> bool {
        self.state.borrow().push.as_ref().expect("push chain head missing").is_done()
    }

    /// Rewire the head in place: `build` receives the current pipeline
    /// and returns a replacement of the same item type.
    pub fn insert_after<F>(&self, build: F)
    where
        F: FnOnce(BoxPush<T>) -> BoxPush<T>,
    {
        let current = self.state.borrow_mut().push.take().expect("push chain head missing");
        self.state.borrow_mut().push = Some(build(current));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::future::ready;

    #[tokio::test]
    async fn maps_then_filters_into_array() {
        let (chain, handle) = PushChainBuilder::<i32, i32>::new()
            .map(|v: i32| ready(v * 2))
            .filter(|v: &i32| ready(*v > 2))
            .to_array();
        chain.push(1).await;
        chain.push(2).await;
        chain.push(3).await;
        assert_eq!(handle.snapshot(), vec![4, 6]);
    }

    #[tokio::test]
    async fn windows_batches_of_individual_pushes() {
        let (chain, handle) = PushChainBuilder::<Vec<i32>, Vec<i32>>::new().window(2).to_array();
        for v in [1, 2, 3, 4] {
            chain.push(v).await;
        }
        assert_eq!(handle.snapshot(), vec![vec![1, 2], vec![3, 4]]);
    }

    #[tokio::test]
    async fn insert_after_rewires_the_materialized_head() {
        let (chain, handle) = PushChainBuilder::<i32, i32>::new().to_array();
        chain.push(1).await;
        chain.insert_after(|head| Box::new(crate::push::transform::Map::new(head, |v: i32| ready(v + 100))));
        chain.push(2).await;
        assert_eq!(handle.snapshot(), vec![1, 102]);
    }

    #[tokio::test]
    async fn forks_to_every_sink() {
        let a = ArrayCollector::new();
        let b = ArrayCollector::new();
        let sinks: Vec<BoxPush<i32>> = vec![Box::new(a), Box::new(b)];
        let chain = PushChainBuilder::<i32, i32>::new().fork(sinks);
        chain.push(1).await;
        chain.push(2).await;
        assert!(!chain.is_done());
    }
}
