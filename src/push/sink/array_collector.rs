use crate::error::CoreError;
use crate::push::{BoxFuture, PushObj};

/// Append every pushed value to an in-memory buffer (spec.md §4.2 "Array
/// collector appending to a buffer"). The buffer supports runtime
/// mutation via [`ArrayCollector::drain`]/[`ArrayCollector::buffer`].
pub struct ArrayCollector<T> {
    buffer: Vec<T>,
    done: bool,
}

impl<T> ArrayCollector<T> {
    pub fn new() -> Self {
        Self { buffer: Vec::new(), done: false }
    }

    pub fn buffer(&self) -> &[T] {
        &self.buffer
    }

    pub fn drain(&mut self) -> Vec<T> {
        std::mem::take(&mut self.buffer)
    }
}

impl<T> Default for ArrayCollector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PushObj for ArrayCollector<T> {
    type Item = T;

    fn next(&mut self, value: T) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            if self.done {
                return true;
            }
            self.buffer.push(value);
            false
        })
    }

    fn return_(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.done = true;
        })
    }

    fn throw(&mut self, _err: CoreError) -> BoxFuture<'_, ()> {
        Box::pin(async move {})
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn collects_pushed_values() {
        let mut sink = ArrayCollector::new();
        sink.next(1).await;
        sink.next(2).await;
        assert_eq!(sink.buffer(), &[1, 2]);
        sink.return_().await;
        assert!(sink.next(3).await);
        assert_eq!(sink.buffer(), &[1, 2]);
    }
}
