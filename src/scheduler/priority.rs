//! Priority source with aging, plus the priority + dependency-graph
//! composite source (spec.md §4.7).
//!
//! Aging means the ranking key changes with wall-clock time between
//! enqueues, which a standard binary-heap invariant does not tolerate
//! (a heap assumes a key is fixed once pushed). A plain `Vec` with a
//! linear best-of scan on `next`/`peek` is used instead — correct by
//! construction at the cost of O(n) per pop, acceptable for the
//! moderate queue depths this scheduler targets.

use std::cell::RefCell;
use std::rc::Rc;

use tokio::time::Instant;

use crate::pull::{BoxFuture, Peek, PullObj};
use crate::scheduler::dag::DependencyGraph;

struct Entry<T> {
    value: T,
    declared_priority: f64,
    seq: u64,
    enqueued_at: Instant,
}

/// A peekable pull source that always yields its highest effective-
/// priority item next; ties break FIFO by enqueue order (spec.md §4.7).
pub struct PrioritySource<T> {
    items: Vec<Entry<T>>,
    next_seq: u64,
    aging_rate: f64,
    max_age_boost: f64,
    closing: bool,
    done: bool,
}

impl<T> PrioritySource<T> {
    /// `aging_rate = 0.0` disables aging entirely (declared priority
    /// never changes).
    pub fn new(aging_rate: f64, max_age_boost: f64) -> Self {
        Self {
            items: Vec::new(),
            next_seq: 0,
            aging_rate,
            max_age_boost,
            closing: false,
            done: false,
        }
    }

    pub fn enqueue(&mut self, value: T, declared_priority: f64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.items.push(Entry {
            value,
            declared_priority,
            seq,
            enqueued_at: Instant::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn effective_priority(&self, entry: &Entry<T>, now: Instant) -> f64 {
        let age_ms = now.duration_since(entry.enqueued_at).as_secs_f64() * 1000.0;
        entry.declared_priority + (self.aging_rate * age_ms).min(self.max_age_boost)
    }

    fn best_index(&self, now: Instant) -> Option<usize> {
        let mut best: Option<(usize, f64, u64)> = None;
        for (idx, entry) in self.items.iter().enumerate() {
            let priority = self.effective_priority(entry, now);
            let better = match best {
                None => true,
                Some((_, best_priority, best_seq)) => {
                    priority > best_priority || (priority == best_priority && entry.seq < best_seq)
                }
            };
            if better {
                best = Some((idx, priority, entry.seq));
            }
        }
        best.map(|(idx, ..)| idx)
    }

    fn pop_best(&mut self) -> Option<T> {
        let now = Instant::now();
        self.best_index(now).map(|idx| self.items.remove(idx).value)
    }

    fn peek_best(&self) -> Option<&T> {
        let now = Instant::now();
        self.best_index(now).map(|idx| &self.items[idx].value)
    }

    /// Requests graceful closure: remaining items still drain in
    /// priority order before `done` is signalled.
    pub fn close_source(&mut self) {
        self.closing = true;
    }
}

impl<T: 'static> PullObj for PrioritySource<T> {
    type Item = T;

    fn next(&mut self) -> BoxFuture<'_, Option<T>> {
        Box::pin(async move {
            if self.done {
                return None;
            }
            if let Some(value) = self.pop_best() {
                return Some(value);
            }
            if self.closing {
                self.done = true;
            }
            None
        })
    }

    fn close(&mut self) {
        self.closing = true;
    }

    fn close_interrupt(&mut self) {
        self.closing = true;
        self.done = true;
        self.items.clear();
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

impl<T: Clone + 'static> Peek for PrioritySource<T> {
    fn peek(&mut self) -> BoxFuture<'_, Option<T>>
    where
        T: Clone,
    {
        Box::pin(async move { if self.done { None } else { self.peek_best().cloned() } })
    }
}

/// Wires a [`DependencyGraph`]'s `on_ready` hook directly to a
/// [`PrioritySource`] so newly-ready keys are enqueued in the same tick
/// their dependencies complete (spec.md §4.7 "Priority + dependency
/// composition").
///
/// `K` must be `Clone` to be both the graph key and the queued item;
/// callers needing a richer payload can enqueue `(K, Payload)` pairs and
/// index back into their own task table on dequeue.
pub struct PriorityDagSource<K> {
    source: Rc<RefCell<PrioritySource<K>>>,
    graph: Rc<RefCell<DependencyGraph<K>>>,
}

impl<K> PriorityDagSource<K>
where
    K: Eq + std::hash::Hash + Clone + std::fmt::Debug + 'static,
{
    /// `priority_of` assigns the declared priority for a key at the
    /// moment it becomes ready (the graph's own `on_ready` callback slot
    /// is claimed by this constructor, so at most one `PriorityDagSource`
    /// may be built per graph).
    pub fn new(graph: Rc<RefCell<DependencyGraph<K>>>, aging_rate: f64, max_age_boost: f64, mut priority_of: impl FnMut(&K) -> f64 + 'static) -> Self {
        let source = Rc::new(RefCell::new(PrioritySource::new(aging_rate, max_age_boost)));

        // Pre-enqueue any node already `ready` at construction time.
        {
            let ready = graph.borrow().ready_keys();
            let mut source_mut = source.borrow_mut();
            for key in ready {
                let priority = priority_of(&key);
                source_mut.enqueue(key, priority);
            }
        }

        let enqueue_source = source.clone();
        graph.borrow_mut().on_ready(move |key| {
            let priority = priority_of(key);
            enqueue_source.borrow_mut().enqueue(key.clone(), priority);
        });

        Self { source, graph }
    }

    /// Pops the best-ranked ready key, if any.
    pub fn next_key(&self) -> Option<K> {
        let now = Instant::now();
        let mut source = self.source.borrow_mut();
        source.best_index(now).map(|idx| source.items.remove(idx).value)
    }

    pub fn peek_key(&self) -> Option<K>
    where
        K: Clone,
    {
        let source = self.source.borrow();
        source.peek_best().cloned()
    }

    pub fn close_source(&self) {
        self.source.borrow_mut().close_source();
    }

    /// Aborting a key cascades through the dependency graph as usual;
    /// any queued-but-not-yet-dequeued keys among the aborted set are
    /// dropped from the priority queue so they are never handed out.
    pub fn abort(&self, key: &K) -> Vec<K> {
        let aborted = self.graph.borrow_mut().abort(key);
        let mut source = self.source.borrow_mut();
        source.items.retain(|entry| !aborted.contains(&entry.value));
        aborted
    }

    pub fn is_done(&self) -> bool {
        self.graph.borrow().is_done() && self.source.borrow().is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn drains_in_declared_priority_order_without_aging() {
        let mut src: PrioritySource<&'static str> = PrioritySource::new(0.0, 0.0);
        src.enqueue("low", 1.0);
        src.enqueue("high", 10.0);
        src.enqueue("med", 5.0);
        src.close_source();
        assert_eq!(src.next().await, Some("high"));
        assert_eq!(src.next().await, Some("med"));
        assert_eq!(src.next().await, Some("low"));
        assert_eq!(src.next().await, None);
        assert!(src.is_done());
    }

    #[tokio::test]
    async fn fifo_tiebreak_on_equal_priority() {
        let mut src: PrioritySource<&'static str> = PrioritySource::new(0.0, 0.0);
        src.enqueue("first", 5.0);
        src.enqueue("second", 5.0);
        src.close_source();
        assert_eq!(src.next().await, Some("first"));
        assert_eq!(src.next().await, Some("second"));
    }

    #[tokio::test(start_paused = true)]
    async fn aging_eventually_overtakes_higher_declared_priority() {
        let mut src: PrioritySource<&'static str> = PrioritySource::new(0.01, 100.0);
        src.enqueue("stale", 1.0);
        tokio::time::advance(Duration::from_millis(600)).await;
        src.enqueue("fresh", 5.0);
        // stale: 1 + min(0.01*600, 100) = 7; fresh: 5 + 0 = 5.
        assert_eq!(src.peek().await, Some("stale"));
    }

    #[test]
    fn priority_dag_source_enqueues_on_completion() {
        let mut graph = DependencyGraph::new();
        graph.add_node("A", vec![]).unwrap();
        graph.add_node("B", vec!["A"]).unwrap();
        let graph = Rc::new(RefCell::new(graph));
        let composite = PriorityDagSource::new(graph.clone(), 0.0, 0.0, |_| 1.0);

        assert_eq!(composite.peek_key(), Some("A"));
        let popped = composite.next_key();
        assert_eq!(popped, Some("A"));

        graph.borrow_mut().complete(&"A");
        assert_eq!(composite.peek_key(), Some("B"));
    }

    #[test]
    fn abort_evicts_queued_keys() {
        let mut graph = DependencyGraph::new();
        graph.add_node("A", vec![]).unwrap();
        graph.add_node("B", vec!["A"]).unwrap();
        let graph = Rc::new(RefCell::new(graph));
        let composite = PriorityDagSource::new(graph.clone(), 0.0, 0.0, |_| 1.0);

        graph.borrow_mut().complete(&"A");
        assert_eq!(composite.peek_key(), Some("B"));
        composite.abort(&"A");
        assert_eq!(composite.peek_key(), None);
    }
}
