//! Scheduled task descriptors and the pool runner that drives them against
//! a [`CapacitySource`] (spec.md §4.8).
//!
//! Directly grounded on `xitca-server`'s `worker/mod.rs::run` accept loop
//! shape (loop; await a gate; consume; dispatch; handle completion) —
//! generalized from "accept a connection when under the fd/connection
//! limit" to "pull a task when capacity allows." The wait phase races
//! every in-flight task's (persisted, never-dropped-mid-poll) `next()`
//! future against the capacity wait object via a hand-rolled
//! `poll_fn` — unlike `crate::pull::combine::race::RacePull`, a losing
//! future here can't simply be rebuilt next round: a scheduled task's
//! generator carries side effects and one-shot commit points, so
//! rebuilding `.next()` on a task whose prior call never resolved would
//! silently drop its in-flight result (spec §3 "final value yielded
//! once").
//!
//! §4.8's "streaming detection" (an async-iterator capability check
//! performed on the runner's return value) has no static-typing
//! equivalent worth keeping: Rust resolves the same question at the call
//! site instead, via [`ScheduledTask::one_shot`] vs.
//! [`ScheduledTask::streaming`] — a compile-time choice rather than a
//! runtime inspection, the same translation already used for the chain
//! compiler's fast-path/general-path split.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::Poll;

use futures_util::future::poll_fn;
use tracing::{debug, error, info, trace, warn};

use crate::error::{CoreError, CoreResult};
use crate::pull::{BoxFuture as PullBoxFuture, BoxPull, PullObj};
use crate::scheduler::capacity::CapacitySource;
use crate::scheduler::cost::{resource_cost, ResourceCost};

/// One step of a running task's output (spec.md §3 "runner is either a
/// `() → Promise<O>` or a `() → AsyncGenerator<I, O>`"). Intermediate and
/// final values share a type here — a deliberate reduction from the
/// source's `AsyncGenerator<I, O>` two-type-parameter shape, since every
/// caller observed in practice reports progress and result as the same
/// kind of value, and threading two independent generics through the
/// whole pool runner buys nothing real callers need.
#[derive(Debug)]
pub enum TaskStep<T> {
    Intermediate(T),
    Final(T),
}

struct OneShotGen<T> {
    fut: Option<PullBoxFuture<'static, CoreResult<T>>>,
    done: bool,
}

impl<T: 'static> PullObj for OneShotGen<T> {
    type Item = CoreResult<TaskStep<T>>;

    fn next(&mut self) -> PullBoxFuture<'_, Option<Self::Item>> {
        Box::pin(async move {
            if self.done {
                return None;
            }
            self.done = true;
            match self.fut.take() {
                Some(fut) => Some(fut.await.map(TaskStep::Final)),
                None => None,
            }
        })
    }

    fn close(&mut self) {
        self.done = true;
    }

    fn close_interrupt(&mut self) {
        self.done = true;
        self.fut = None;
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

/// `(key, runner, cost, onComplete?, onError?)` (spec.md §3 "Scheduled
/// task", §6 "Task descriptor"). Cost defaults to `{capacity: 1}` via
/// [`ScheduledTask::default_cost`].
pub struct ScheduledTask<T> {
    pub key: String,
    pub cost: ResourceCost,
    start: Box<dyn FnOnce() -> BoxPull<CoreResult<TaskStep<T>>>>,
    on_complete: Option<Rc<dyn Fn(&T)>>,
    on_error: Option<Rc<dyn Fn(&CoreError)>>,
}

impl<T: 'static> ScheduledTask<T> {
    pub fn default_cost() -> ResourceCost {
        resource_cost([("capacity", 1.0)])
    }

    /// A runner that resolves exactly once (`() → Promise<O>`), wrapped
    /// internally as a one-value generator so the pool runner's loop has
    /// a single shape to drive regardless of task kind.
    pub fn one_shot(key: impl Into<String>, cost: ResourceCost, fut: impl Future<Output = CoreResult<T>> + 'static) -> Self {
        let fut: PullBoxFuture<'static, CoreResult<T>> = Box::pin(fut);
        Self {
            key: key.into(),
            cost,
            start: Box::new(move || Box::new(OneShotGen { fut: Some(fut), done: false }) as BoxPull<CoreResult<TaskStep<T>>>),
            on_complete: None,
            on_error: None,
        }
    }

    /// A runner that yields zero or more `Intermediate` steps before a
    /// single `Final` step (`() → AsyncGenerator<I, O>`). `build` is
    /// invoked lazily when the pool runner actually starts the task, not
    /// at construction time, matching the source's "runner invoked
    /// exactly once" lifecycle.
    pub fn streaming(key: impl Into<String>, cost: ResourceCost, build: impl FnOnce() -> BoxPull<CoreResult<TaskStep<T>>> + 'static) -> Self {
        Self {
            key: key.into(),
            cost,
            start: Box::new(build),
            on_complete: None,
            on_error: None,
        }
    }

    pub fn on_complete(mut self, f: impl Fn(&T) + 'static) -> Self {
        self.on_complete = Some(Rc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&CoreError) + 'static) -> Self {
        self.on_error = Some(Rc::new(f));
        self
    }
}

/// `(taskId, type ∈ {INTERMEDIATE, FINAL, ERROR}, value?, error?)`
/// (spec.md §3 "Progress envelope", §6).
#[derive(Debug)]
pub enum ProgressEnvelope<T> {
    Intermediate { task_key: String, value: T },
    Final { task_key: String, value: T },
    Error { task_key: String, error: CoreError },
}

/// A peekable source of [`ScheduledTask`]s. `peek_cost` is synchronous
/// (unlike [`crate::pull::Peek`]'s `Clone`-bound lookahead) because a
/// scheduled task is a pre-built descriptor carrying its own cost — the
/// pool runner only ever needs that cost ahead of consumption, never the
/// whole (non-`Clone`, closure-holding) task value.
pub trait TaskSource<T> {
    fn peek_cost(&mut self) -> Option<ResourceCost>;
    fn next_task(&mut self) -> PullBoxFuture<'_, Option<ScheduledTask<T>>>;
    fn is_done(&self) -> bool;
}

/// A plain FIFO queue of pre-built tasks; closes (one-shot) once drained
/// unless tasks are pushed onto it later via [`VecTaskSource::push`].
pub struct VecTaskSource<T> {
    queue: VecDeque<ScheduledTask<T>>,
    closing: bool,
}

impl<T> VecTaskSource<T> {
    pub fn new(tasks: impl IntoIterator<Item = ScheduledTask<T>>) -> Self {
        Self {
            queue: tasks.into_iter().collect(),
            closing: true,
        }
    }

    pub fn open() -> Self {
        Self {
            queue: VecDeque::new(),
            closing: false,
        }
    }

    pub fn push(&mut self, task: ScheduledTask<T>) {
        self.queue.push_back(task);
    }

    pub fn close(&mut self) {
        self.closing = true;
    }
}

impl<T: 'static> TaskSource<T> for VecTaskSource<T> {
    fn peek_cost(&mut self) -> Option<ResourceCost> {
        self.queue.front().map(|t| t.cost.clone())
    }

    fn next_task(&mut self) -> PullBoxFuture<'_, Option<ScheduledTask<T>>> {
        Box::pin(async move { self.queue.pop_front() })
    }

    fn is_done(&self) -> bool {
        self.closing && self.queue.is_empty()
    }
}

/// An in-flight task's generator, shared via `Rc<RefCell<_>>` so the
/// per-round `next()` future built from it can be `'static` and, crucially,
/// kept alive (instead of rebuilt) across wait-phase iterations where it
/// didn't win the race (see module docs).
type SharedGen<T> = Rc<RefCell<BoxPull<CoreResult<TaskStep<T>>>>>;

struct InFlight<T> {
    key: String,
    cost: ResourceCost,
    gen: SharedGen<T>,
    /// The not-yet-resolved `next()` future for this slot's generator, if
    /// one is currently outstanding. `None` means the previous value was
    /// already consumed and a fresh `next()` call hasn't been started yet.
    pending: Option<PullBoxFuture<'static, Option<CoreResult<TaskStep<T>>>>>,
    on_complete: Option<Rc<dyn Fn(&T)>>,
    on_error: Option<Rc<dyn Fn(&CoreError)>>,
}

/// Outcome of the wait phase's `poll_fn` race: either the capacity source
/// signaled (something was released, worth re-checking the intake loop),
/// or one in-flight slot's `next()` future resolved.
enum WaitOutcome<T> {
    CapacityFreed,
    Task(usize, Option<CoreResult<TaskStep<T>>>),
}

/// Drives a [`TaskSource`] against a [`CapacitySource`], yielding one
/// [`ProgressEnvelope`] per call to `next()` (spec.md §4.8). Implements
/// [`PullObj`] itself so it composes with the rest of the pull machinery
/// (`collect`, `for_each`, chain transforms) like any other source.
pub struct PoolRunner<S, T> {
    source: S,
    capacity: CapacitySource,
    in_flight: Vec<InFlight<T>>,
    stop_on_error: bool,
    done: bool,
}

impl<S, T> PoolRunner<S, T>
where
    S: TaskSource<T>,
    T: 'static,
{
    pub fn new(source: S, capacity: CapacitySource) -> Self {
        Self {
            source,
            capacity,
            in_flight: Vec::new(),
            stop_on_error: false,
            done: false,
        }
    }

    /// When set, an `ERROR` envelope marks the runner permanently done
    /// rather than continuing to the next task (spec.md §7 "the scheduled
    /// runner ... continues to the next task unless configured to stop").
    pub fn stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}

impl<S, T> PullObj for PoolRunner<S, T>
where
    S: TaskSource<T>,
    T: 'static,
{
    type Item = ProgressEnvelope<T>;

    fn next(&mut self) -> PullBoxFuture<'_, Option<ProgressEnvelope<T>>> {
        Box::pin(async move {
            if self.done {
                return None;
            }
            'outer: loop {
                loop {
                    if self.source.is_done() {
                        break;
                    }
                    let peeked_cost = match self.source.peek_cost() {
                        Some(cost) => cost,
                        None => break,
                    };
                    if !self.capacity.can_acquire(&peeked_cost) {
                        if !self.in_flight.is_empty() {
                            break;
                        }
                        let wait_handle = self.capacity.wait_obj();
                        let _ = wait_handle.wait().await;
                        continue;
                    }

                    let task = match self.source.next_task().await {
                        Some(task) => task,
                        None => break,
                    };
                    // Re-check: a dynamic source may have handed back a
                    // different task than the one peeked (spec.md §4.8).
                    if self.capacity.can_acquire(&task.cost) {
                        self.capacity
                            .acquire_immediate(&task.cost)
                            .expect("can_acquire just verified this under the single-scheduling-domain guarantee");
                        debug!(task_key = %task.key, cost = ?task.cost, "pool runner starting task");
                        self.in_flight.push(InFlight {
                            key: task.key,
                            cost: task.cost,
                            gen: Rc::new(RefCell::new((task.start)())),
                            pending: None,
                            on_complete: task.on_complete,
                            on_error: task.on_error,
                        });
                    }
                }

                if self.source.is_done() && self.in_flight.is_empty() {
                    self.done = true;
                    return None;
                }

                let wait_handle = self.capacity.wait_obj();
                let mut wait_fut = wait_handle.wait();
                for slot in self.in_flight.iter_mut() {
                    if slot.pending.is_none() {
                        let gen = slot.gen.clone();
                        slot.pending = Some(Box::pin(async move { gen.borrow_mut().next().await }));
                    }
                }

                let in_flight = &mut self.in_flight;
                let outcome = poll_fn(|cx| {
                    if Pin::new(&mut wait_fut).poll(cx).is_ready() {
                        return Poll::Ready(WaitOutcome::CapacityFreed);
                    }
                    for (idx, slot) in in_flight.iter_mut().enumerate() {
                        let fut = slot.pending.as_mut().expect("ensured present above");
                        if let Poll::Ready(step) = fut.as_mut().poll(cx) {
                            slot.pending = None;
                            return Poll::Ready(WaitOutcome::Task(idx, step));
                        }
                    }
                    Poll::Pending
                })
                .await;

                match outcome {
                    WaitOutcome::CapacityFreed => continue 'outer,
                    WaitOutcome::Task(idx, outcome) => match outcome {
                        Some(Ok(TaskStep::Intermediate(value))) => {
                            let task_key = self.in_flight[idx].key.clone();
                            trace!(task_key = %task_key, "pool runner task reported progress");
                            return Some(ProgressEnvelope::Intermediate { task_key, value });
                        }
                        Some(Ok(TaskStep::Final(value))) => {
                            let slot = self.in_flight.remove(idx);
                            self.capacity.release(&slot.cost);
                            info!(task_key = %slot.key, "pool runner task completed");
                            if let Some(cb) = &slot.on_complete {
                                cb(&value);
                            }
                            return Some(ProgressEnvelope::Final { task_key: slot.key, value });
                        }
                        Some(Err(error)) => {
                            let slot = self.in_flight.remove(idx);
                            self.capacity.release(&slot.cost);
                            error!(task_key = %slot.key, error = %error, "pool runner task failed");
                            if let Some(cb) = &slot.on_error {
                                cb(&error);
                            }
                            if self.stop_on_error {
                                self.done = true;
                            }
                            return Some(ProgressEnvelope::Error { task_key: slot.key, error });
                        }
                        // Malformed generator: exhausted with no Final. Resources
                        // are released and the loop simply tries again — there is
                        // no value to report for this task.
                        None => {
                            let slot = self.in_flight.remove(idx);
                            self.capacity.release(&slot.cost);
                            warn!(task_key = %slot.key, "pool runner task generator exhausted without a Final step");
                            continue 'outer;
                        }
                    },
                }
            }
        })
    }

    fn close(&mut self) {
        self.done = self.in_flight.is_empty();
    }

    fn close_interrupt(&mut self) {
        self.done = true;
        self.in_flight.clear();
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scheduler::cost::resource_cost;
    use std::time::Duration;

    #[tokio::test]
    async fn second_task_waits_for_first_to_release() {
        let capacity = CapacitySource::new(resource_cost([("gpu", 2.0), ("cpu", 3.0)]));
        let first = ScheduledTask::one_shot("first", resource_cost([("gpu", 2.0), ("cpu", 1.0)]), async { Ok(1) });
        let second = ScheduledTask::one_shot("second", resource_cost([("gpu", 1.0), ("cpu", 2.0)]), async { Ok(2) });
        let source = VecTaskSource::new([first, second]);
        let mut runner = PoolRunner::new(source, capacity);

        let mut finals = Vec::new();
        while let Some(envelope) = runner.next().await {
            if let ProgressEnvelope::Final { task_key, value } = envelope {
                finals.push((task_key, value));
            }
        }
        let mut keys: Vec<_> = finals.iter().map(|(k, _)| k.clone()).collect();
        keys.sort();
        assert_eq!(keys, vec!["first", "second"]);
    }

    /// A fast task resolving before a slow task's `next()` future has
    /// resolved must not cause the slow task's eventual result to be
    /// lost — the wait phase must keep polling the losing future on
    /// later iterations rather than rebuilding (and dropping) it.
    #[tokio::test(start_paused = true)]
    async fn slow_task_result_survives_a_faster_task_winning_the_race() {
        let capacity = CapacitySource::new(resource_cost([("capacity", 2.0)]));
        let slow = ScheduledTask::one_shot("slow", ScheduledTask::<i32>::default_cost(), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(1)
        });
        let fast = ScheduledTask::one_shot("fast", ScheduledTask::<i32>::default_cost(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(2)
        });
        let source = VecTaskSource::new([slow, fast]);
        let mut runner = PoolRunner::new(source, capacity);

        let mut finals = Vec::new();
        while let Some(envelope) = runner.next().await {
            if let ProgressEnvelope::Final { task_key, value } = envelope {
                finals.push((task_key, value));
            }
        }
        let mut keys: Vec<_> = finals.iter().map(|(k, _)| k.clone()).collect();
        keys.sort();
        assert_eq!(keys, vec!["fast", "slow"]);
    }

    /// A bare FIFO generator, used in tests in place of [`crate::pull::source::ArraySource`]
    /// since that source requires `T: Clone` and a `CoreResult<TaskStep<T>>` is not.
    struct QueueGen<T>(VecDeque<T>);

    impl<T: 'static> PullObj for QueueGen<T> {
        type Item = T;
        fn next(&mut self) -> PullBoxFuture<'_, Option<T>> {
            Box::pin(async move { self.0.pop_front() })
        }
        fn close(&mut self) {
            self.0.clear();
        }
        fn close_interrupt(&mut self) {
            self.0.clear();
        }
        fn is_done(&self) -> bool {
            self.0.is_empty()
        }
    }

    #[tokio::test]
    async fn streaming_task_yields_intermediates_then_final() {
        let capacity = CapacitySource::new(resource_cost([("capacity", 1.0)]));
        let task = ScheduledTask::streaming("stream", ScheduledTask::<i32>::default_cost(), || {
            let values = VecDeque::from(vec![
                Ok(TaskStep::Intermediate(1)),
                Ok(TaskStep::Intermediate(2)),
                Ok(TaskStep::Final(3)),
            ]);
            Box::new(QueueGen(values)) as BoxPull<CoreResult<TaskStep<i32>>>
        });
        let source = VecTaskSource::new([task]);
        let mut runner = PoolRunner::new(source, capacity);

        let mut seen = Vec::new();
        while let Some(envelope) = runner.next().await {
            match envelope {
                ProgressEnvelope::Intermediate { value, .. } => seen.push(format!("I{value}")),
                ProgressEnvelope::Final { value, .. } => seen.push(format!("F{value}")),
                ProgressEnvelope::Error { .. } => seen.push("E".to_string()),
            }
        }
        assert_eq!(seen, vec!["I1", "I2", "F3"]);
    }

    #[tokio::test]
    async fn error_releases_resources_and_continues_by_default() {
        let capacity = CapacitySource::new(resource_cost([("capacity", 2.0)]));
        let failing = ScheduledTask::one_shot("bad", ScheduledTask::<i32>::default_cost(), async {
            Err(CoreError::Timeout(5))
        });
        let ok = ScheduledTask::one_shot("good", ScheduledTask::<i32>::default_cost(), async { Ok(7) });
        let source = VecTaskSource::new([failing, ok]);
        let mut runner = PoolRunner::new(source, capacity);

        let mut saw_error = false;
        let mut saw_final = false;
        while let Some(envelope) = runner.next().await {
            match envelope {
                ProgressEnvelope::Error { .. } => saw_error = true,
                ProgressEnvelope::Final { .. } => saw_final = true,
                ProgressEnvelope::Intermediate { .. } => {}
            }
        }
        assert!(saw_error && saw_final);
    }
}
