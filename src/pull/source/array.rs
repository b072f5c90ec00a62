use std::collections::VecDeque;

use crate::pull::{BoxFuture, Peek, PullObj};

/// Drain order for [`ArraySource`] (spec.md §4.1 source variant (b)).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayDrainOrder {
    Fifo,
    Lifo,
}

/// Array buffer source. Each cycle drains `buffer` in `order`; when the
/// queue empties, the base lifecycle either re-fills from the (possibly
/// mutated) `buffer` and starts a new cycle, or — if `one_shot` was set at
/// construction, or `close()`/`close_interrupt()` was called — settles
/// into done.
pub struct ArraySource<T> {
    buffer: Vec<T>,
    order: ArrayDrainOrder,
    queue: VecDeque<T>,
    closing: bool,
    done: bool,
}

impl<T: Clone> ArraySource<T> {
    pub fn new(buffer: Vec<T>, order: ArrayDrainOrder) -> Self {
        let queue = Self::fill(&buffer, order);
        Self {
            buffer,
            order,
            queue,
            closing: false,
            done: false,
        }
    }

    /// One-shot mode asserts `closing` in the constructor (spec.md §4.1):
    /// the buffer is drained exactly once, then the source is done.
    pub fn one_shot(buffer: Vec<T>, order: ArrayDrainOrder) -> Self {
        let mut src = Self::new(buffer, order);
        src.closing = true;
        src
    }

    fn fill(buffer: &[T], order: ArrayDrainOrder) -> VecDeque<T> {
        let mut queue: VecDeque<T> = buffer.iter().cloned().collect();
        if order == ArrayDrainOrder::Lifo {
            // draining from the front below, so reverse once up front to
            // get last-in-first-out order without per-pop reversal cost.
            let rev: VecDeque<T> = queue.into_iter().rev().collect();
            queue = rev;
        }
        queue
    }

    /// Replace the configured buffer. Effective on the next cycle; the
    /// in-flight drain continues from the old queue.
    pub fn set_buffer(&mut self, buffer: Vec<T>) {
        self.buffer = buffer;
    }

    pub fn push(&mut self, value: T) {
        self.buffer.push(value);
    }
}

impl<T: Clone> PullObj for ArraySource<T> {
    type Item = T;

    fn next(&mut self) -> BoxFuture<'_, Option<T>> {
        Box::pin(async move {
            if self.done {
                return None;
            }
            if let Some(v) = self.queue.pop_front() {
                return Some(v);
            }
            if self.closing {
                self.done = true;
                return None;
            }
            // natural completion: recreate the generator from the
            // current (possibly reconfigured) buffer and start over.
            self.queue = Self::fill(&self.buffer, self.order);
            self.queue.pop_front()
        })
    }

    fn close(&mut self) {
        self.closing = true;
    }

    fn close_interrupt(&mut self) {
        self.closing = true;
        self.done = true;
        self.queue.clear();
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

impl<T: Clone> Peek for ArraySource<T> {
    fn peek(&mut self) -> BoxFuture<'_, Option<T>>
    where
        T: Clone,
    {
        Box::pin(async move {
            if self.done {
                return None;
            }
            if let Some(v) = self.queue.front() {
                return Some(v.clone());
            }
            if self.closing {
                return None;
            }
            self.queue = Self::fill(&self.buffer, self.order);
            self.queue.front().cloned()
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn fifo_drain_then_cycles() {
        let mut src = ArraySource::new(vec![1, 2, 3], ArrayDrainOrder::Fifo);
        assert_eq!(src.next().await, Some(1));
        assert_eq!(src.next().await, Some(2));
        assert_eq!(src.next().await, Some(3));
        // natural completion recreates the generator
        assert_eq!(src.next().await, Some(1));
    }

    #[tokio::test]
    async fn lifo_drain_order() {
        let mut src = ArraySource::new(vec![1, 2, 3], ArrayDrainOrder::Lifo);
        assert_eq!(src.next().await, Some(3));
        assert_eq!(src.next().await, Some(2));
        assert_eq!(src.next().await, Some(1));
    }

    #[tokio::test]
    async fn one_shot_terminates() {
        let mut src = ArraySource::one_shot(vec![1, 2], ArrayDrainOrder::Fifo);
        assert_eq!(src.next().await, Some(1));
        assert_eq!(src.next().await, Some(2));
        assert_eq!(src.next().await, None);
        assert!(src.is_done());
    }

    #[tokio::test]
    async fn reconfigure_takes_effect_next_cycle() {
        let mut src = ArraySource::new(vec![1], ArrayDrainOrder::Fifo);
        assert_eq!(src.next().await, Some(1));
        src.set_buffer(vec![9, 9]);
        assert_eq!(src.next().await, Some(9));
        assert_eq!(src.next().await, Some(9));
    }
}
