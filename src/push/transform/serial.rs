use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::CoreError;
use crate::push::{BoxFuture, PushObj};

/// Queue concurrent pushes so the downstream sink receives them
/// sequentially (spec.md §4.2 `serial`, §5 "`serial()` guarantees
/// sequential delivery downstream regardless of caller concurrency").
///
/// Used directly (through `&mut self`), `Serial` is a plain passthrough —
/// Rust's exclusive-borrow rule already forbids two concurrent `&mut`
/// pushes on one object. The actual guarantee this type exists for shows
/// up through [`SerialHandle`], a cloneable, `Arc<Mutex<_>>`-backed front
/// end multiple concurrent tasks can each hold and push through: the
/// mutex orders their pushes into the one sequential delivery stream.
pub struct Serial<S> {
    sink: S,
    done: bool,
}

impl<S> Serial<S> {
    pub fn new(sink: S) -> Self {
        Self { sink, done: false }
    }

    /// Wrap this serializer in a cloneable handle for concurrent callers.
    pub fn into_handle(self) -> SerialHandle<S> {
        SerialHandle(Arc::new(Mutex::new(self)))
    }
}

impl<S: PushObj> PushObj for Serial<S> {
    type Item = S::Item;

    fn next(&mut self, value: S::Item) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            if self.done {
                return true;
            }
            self.done = self.sink.next(value).await;
            self.done
        })
    }

    fn return_(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.done = true;
            self.sink.return_().await;
        })
    }

    fn throw(&mut self, err: CoreError) -> BoxFuture<'_, ()> {
        Box::pin(async move { self.sink.throw(err).await })
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

/// Cloneable front end for [`Serial`]; every clone pushes through the
/// same mutex-guarded sink, so concurrent callers are ordered into one
/// sequential delivery stream.
pub struct SerialHandle<S>(Arc<Mutex<Serial<S>>>);

impl<S> Clone for SerialHandle<S> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<S: PushObj> SerialHandle<S> {
    pub async fn next(&self, value: S::Item) -> bool {
        self.0.lock().await.next(value).await
    }

    pub async fn return_(&self) {
        self.0.lock().await.return_().await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::push::sink::ArrayCollector;

    #[tokio::test]
    async fn concurrent_pushes_interleave_sequentially() {
        let handle = Serial::new(ArrayCollector::new()).into_handle();
        let a = handle.clone();
        let b = handle.clone();
        tokio::join!(a.next(1), b.next(2));
        let inner = handle.0.lock().await;
        assert_eq!(inner.sink.buffer().len(), 2);
    }
}
