//! Dependency graph with incremental cycle detection and BFS cascading
//! abort (spec.md §4.6).
//!
//! No teacher analog — `xitca-web` has no build/task graph. Grounded on
//! the general incremental-topological-insert + BFS-cascade shape common
//! to the pack's other scheduler-shaped repos; a plain `HashMap`-keyed
//! adjacency list rather than a dedicated graph crate, matching the
//! teacher's general preference for hand-rolled data structures over an
//! extra dependency for something this small.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{CoreError, CoreResult};

/// A dependency node's lifecycle state (spec.md §3 "Dependency node").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Pending,
    Ready,
    Running,
    Completed,
    Failed,
    Aborted,
}

struct Node<K> {
    state: NodeState,
    deps: Vec<K>,
    dependents: Vec<K>,
}

/// Directed acyclic graph keyed by `K` (spec.md §4.6).
///
/// `on_ready`/`on_complete` fire synchronously during the transition that
/// triggers them — required so a coupled priority source (§4.7) can
/// enqueue newly-ready keys with no async gap between completion and
/// re-enqueue.
pub struct DependencyGraph<K> {
    nodes: HashMap<K, Node<K>>,
    insertion_order: Vec<K>,
    on_ready: Option<Box<dyn FnMut(&K)>>,
    on_complete: Option<Box<dyn FnMut(&K)>>,
}

impl<K> Default for DependencyGraph<K>
where
    K: Eq + Hash + Clone + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> DependencyGraph<K>
where
    K: Eq + Hash + Clone + Debug,
{
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            insertion_order: Vec::new(),
            on_ready: None,
            on_complete: None,
        }
    }

    pub fn on_ready(&mut self, f: impl FnMut(&K) + 'static) {
        self.on_ready = Some(Box::new(f));
    }

    pub fn on_complete(&mut self, f: impl FnMut(&K) + 'static) {
        self.on_complete = Some(Box::new(f));
    }

    /// Rejects duplicate keys; rejects a dependency on a key that has not
    /// already been added (including `key` depending on itself); nodes
    /// with no dependencies start `ready` and fire `on_ready` immediately.
    pub fn add_node(&mut self, key: K, deps: Vec<K>) -> CoreResult<()> {
        if self.nodes.contains_key(&key) {
            return Err(CoreError::DuplicateNode(format!("{key:?}")));
        }
        if deps.iter().any(|d| *d == key) {
            return Err(CoreError::Cycle(format!("{key:?}")));
        }
        for dep in &deps {
            if !self.nodes.contains_key(dep) {
                return Err(CoreError::UnknownDependency(format!("{dep:?}")));
            }
        }

        let ready = deps.iter().all(|d| matches!(self.nodes.get(d).map(|n| n.state), Some(NodeState::Completed)));
        for dep in &deps {
            self.nodes.get_mut(dep).unwrap().dependents.push(key.clone());
        }
        self.nodes.insert(
            key.clone(),
            Node {
                state: if ready { NodeState::Ready } else { NodeState::Pending },
                deps,
                dependents: Vec::new(),
            },
        );
        self.insertion_order.push(key.clone());
        if ready {
            if let Some(cb) = self.on_ready.as_mut() {
                cb(&key);
            }
        }
        Ok(())
    }

    /// Topologically sorts the batch before inserting, so forward
    /// references within the same call (`{A:[B], B:[]}` in either order)
    /// resolve correctly; a batch that cannot be fully ordered contains a
    /// cycle and is rejected with no nodes added.
    pub fn add_all(&mut self, batch: HashMap<K, Vec<K>>) -> CoreResult<()> {
        let mut in_degree: HashMap<K, usize> = HashMap::new();
        let mut dependents: HashMap<K, Vec<K>> = HashMap::new();
        for (key, deps) in &batch {
            in_degree.entry(key.clone()).or_insert(0);
            for dep in deps {
                if batch.contains_key(dep) {
                    *in_degree.entry(key.clone()).or_insert(0) += 1;
                    dependents.entry(dep.clone()).or_default().push(key.clone());
                }
            }
        }

        let mut queue: VecDeque<K> = in_degree.iter().filter(|(_, d)| **d == 0).map(|(k, _)| k.clone()).collect();
        let mut order = Vec::with_capacity(batch.len());
        let mut remaining = in_degree.clone();
        while let Some(key) = queue.pop_front() {
            order.push(key.clone());
            if let Some(next) = dependents.get(&key) {
                for dependent in next {
                    let degree = remaining.get_mut(dependent).unwrap();
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dependent.clone());
                    }
                }
            }
        }
        if order.len() != batch.len() {
            return Err(CoreError::Cycle("addAll batch contains a cycle".to_string()));
        }

        for key in order {
            let deps = batch.get(&key).unwrap().clone();
            self.add_node(key, deps)?;
        }
        Ok(())
    }

    pub fn start(&mut self, key: &K) {
        if let Some(node) = self.nodes.get_mut(key) {
            if node.state == NodeState::Ready {
                node.state = NodeState::Running;
            }
        }
    }

    /// Marks `key` completed and returns the keys that became newly
    /// `ready` as a result (every dependency now completed). Fires
    /// `on_complete(key)` then `on_ready` for each newly-ready key, in
    /// that order.
    pub fn complete(&mut self, key: &K) -> Vec<K> {
        match self.nodes.get_mut(key) {
            Some(node) if !matches!(node.state, NodeState::Completed | NodeState::Aborted) => {
                node.state = NodeState::Completed;
            }
            _ => return Vec::new(),
        }

        let dependents = self.nodes.get(key).unwrap().dependents.clone();
        let mut newly_ready = Vec::new();
        for dependent in &dependents {
            let becomes_ready = {
                let node = self.nodes.get(dependent).unwrap();
                node.state == NodeState::Pending
                    && node.deps.iter().all(|d| matches!(self.nodes.get(d).map(|n| n.state), Some(NodeState::Completed)))
            };
            if becomes_ready {
                self.nodes.get_mut(dependent).unwrap().state = NodeState::Ready;
                newly_ready.push(dependent.clone());
            }
        }

        if let Some(cb) = self.on_complete.as_mut() {
            cb(key);
        }
        for ready_key in &newly_ready {
            if let Some(cb) = self.on_ready.as_mut() {
                cb(ready_key);
            }
        }
        newly_ready
    }

    /// `running → failed → ready`: transient, so the task can be
    /// re-enqueued. Fires `on_ready` again since the node is schedulable
    /// once more.
    pub fn fail(&mut self, key: &K) {
        let became_ready = match self.nodes.get_mut(key) {
            Some(node) if node.state == NodeState::Running => {
                node.state = NodeState::Ready;
                true
            }
            _ => false,
        };
        if became_ready {
            if let Some(cb) = self.on_ready.as_mut() {
                cb(key);
            }
        }
    }

    /// BFS over transitive dependents, marking every non-terminal node
    /// `aborted`. A node already `completed` is left untouched (and its
    /// dependents are not visited through it) — aborting a completed node
    /// is a no-op (spec.md §3).
    pub fn abort(&mut self, key: &K) -> Vec<K> {
        let mut aborted = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(key.clone());

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            let node = match self.nodes.get_mut(&current) {
                Some(node) => node,
                None => continue,
            };
            if matches!(node.state, NodeState::Completed | NodeState::Aborted) {
                continue;
            }
            node.state = NodeState::Aborted;
            aborted.push(current.clone());
            queue.extend(node.dependents.clone());
        }
        aborted
    }

    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_done(&self) -> bool {
        self.nodes
            .values()
            .all(|n| matches!(n.state, NodeState::Completed | NodeState::Aborted))
    }

    pub fn state_of(&self, key: &K) -> Option<NodeState> {
        self.nodes.get(key).map(|n| n.state)
    }

    pub fn dependencies_of(&self, key: &K) -> Option<&[K]> {
        self.nodes.get(key).map(|n| n.deps.as_slice())
    }

    pub fn dependents_of(&self, key: &K) -> Option<&[K]> {
        self.nodes.get(key).map(|n| n.dependents.as_slice())
    }

    fn keys_in_state(&self, state: NodeState) -> Vec<K> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.state == state)
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn ready_keys(&self) -> Vec<K> {
        self.keys_in_state(NodeState::Ready)
    }

    pub fn running_keys(&self) -> Vec<K> {
        self.keys_in_state(NodeState::Running)
    }

    pub fn completed_keys(&self) -> Vec<K> {
        self.keys_in_state(NodeState::Completed)
    }

    /// A topological ordering of every node currently in the graph,
    /// derived from insertion order filtered to surviving keys (every
    /// `add_node` call only accepts deps already present, so insertion
    /// order is already a valid topological order).
    pub fn topological_sort(&self) -> Vec<K> {
        self.insertion_order.clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn diamond() -> DependencyGraph<&'static str> {
        let mut graph = DependencyGraph::new();
        graph.add_node("A", vec![]).unwrap();
        graph.add_node("B", vec!["A"]).unwrap();
        graph.add_node("C", vec!["A"]).unwrap();
        graph.add_node("D", vec!["B", "C"]).unwrap();
        graph
    }

    #[test]
    fn completion_cascades_newly_ready() {
        let mut graph = diamond();
        assert_eq!(graph.complete(&"A"), vec!["B", "C"]);
        graph.complete(&"B");
        assert_eq!(graph.complete(&"C"), vec!["D"]);
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let mut graph: DependencyGraph<&'static str> = DependencyGraph::new();
        graph.add_node("X", vec!["X"]).unwrap_err();
        assert_eq!(graph.size(), 0);
    }

    #[test]
    fn unknown_dependency_rejected() {
        let mut graph: DependencyGraph<&'static str> = DependencyGraph::new();
        let err = graph.add_node("X", vec!["Y"]).unwrap_err();
        assert!(matches!(err, CoreError::UnknownDependency(_)));
        assert_eq!(graph.size(), 0);
    }

    #[test]
    fn abort_cascades_to_all_transitive_dependents() {
        let mut graph = diamond();
        graph.start(&"A");
        let aborted = graph.abort(&"A");
        let mut aborted_sorted = aborted.clone();
        aborted_sorted.sort();
        assert_eq!(aborted_sorted, vec!["A", "B", "C", "D"]);
        assert!(graph.is_done());
    }

    #[test]
    fn aborting_completed_node_is_noop() {
        let mut graph = diamond();
        graph.complete(&"A");
        graph.complete(&"B");
        graph.complete(&"C");
        graph.complete(&"D");
        assert_eq!(graph.abort(&"A"), Vec::<&'static str>::new());
        assert!(graph.is_done());
    }

    #[test]
    fn add_all_resolves_forward_references() {
        let mut graph: DependencyGraph<&'static str> = DependencyGraph::new();
        let mut batch = HashMap::new();
        batch.insert("B", vec!["A"]);
        batch.insert("A", vec![]);
        graph.add_all(batch).unwrap();
        assert_eq!(graph.state_of(&"A"), Some(NodeState::Ready));
        assert_eq!(graph.state_of(&"B"), Some(NodeState::Pending));
    }

    #[test]
    fn add_all_detects_mutual_cycle() {
        let mut graph: DependencyGraph<&'static str> = DependencyGraph::new();
        let mut batch = HashMap::new();
        batch.insert("A", vec!["B"]);
        batch.insert("B", vec!["A"]);
        let err = graph.add_all(batch).unwrap_err();
        assert!(matches!(err, CoreError::Cycle(_)));
        assert_eq!(graph.size(), 0);
    }

    #[test]
    fn fail_returns_node_to_ready_for_retry() {
        let mut graph: DependencyGraph<&'static str> = DependencyGraph::new();
        graph.add_node("A", vec![]).unwrap();
        graph.start(&"A");
        graph.fail(&"A");
        assert_eq!(graph.state_of(&"A"), Some(NodeState::Ready));
    }
}
