use crate::error::CoreError;
use crate::push::{BoxFuture, PushObj};

/// Invoke every registered callback per pushed value; return values are
/// ignored (spec.md §4.2 "Callback array invoked per value, return values
/// ignored"). Callbacks support runtime mutation via
/// [`CallbackSink::push_callback`]/[`CallbackSink::set_callbacks`].
pub struct CallbackSink<T> {
    callbacks: Vec<Box<dyn FnMut(&T) + Send>>,
    done: bool,
}

impl<T> CallbackSink<T> {
    pub fn new() -> Self {
        Self { callbacks: Vec::new(), done: false }
    }

    pub fn push_callback<F: FnMut(&T) + Send + 'static>(&mut self, f: F) {
        self.callbacks.push(Box::new(f));
    }

    pub fn set_callbacks(&mut self, callbacks: Vec<Box<dyn FnMut(&T) + Send>>) {
        self.callbacks = callbacks;
    }
}

impl<T> Default for CallbackSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PushObj for CallbackSink<T> {
    type Item = T;

    fn next(&mut self, value: T) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            if self.done {
                return true;
            }
            for cb in &mut self.callbacks {
                cb(&value);
            }
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
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn invokes_every_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut sink = CallbackSink::new();
        let a = seen.clone();
        let b = seen.clone();
        sink.push_callback(move |v: &i32| a.lock().unwrap().push(*v));
        sink.push_callback(move |v: &i32| b.lock().unwrap().push(*v * 10));
        assert!(!sink.next(1).await);
        assert_eq!(*seen.lock().unwrap(), vec![1, 10]);
    }
}
