use crate::pull::{BoxFuture, Peek, PullObj};

/// A single cached value, re-yielded every cycle (spec.md §4.1 source
/// variant (a)). Never exhausts on its own; only `close`/`close_interrupt`
/// stop it. Mid-stream reconfiguration of the cached value is picked up
/// on the very next `next()` call since there is no separate generator to
/// recreate.
pub struct ValueSource<T> {
    value: T,
    closing: bool,
    done: bool,
}

impl<T> ValueSource<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            closing: false,
            done: false,
        }
    }

    /// Reconfigure the cached value. Effective on the next cycle (spec.md
    /// §3 "mutations are picked up on the next generator cycle").
    pub fn set_value(&mut self, value: T) {
        self.value = value;
    }
}

impl<T: Clone> PullObj for ValueSource<T> {
    type Item = T;

    fn next(&mut self) -> BoxFuture<'_, Option<T>> {
        Box::pin(async move {
            if self.done {
                return None;
            }
            if self.closing {
                self.done = true;
                return None;
            }
            Some(self.value.clone())
        })
    }

    fn close(&mut self) {
        self.closing = true;
    }

    fn close_interrupt(&mut self) {
        self.closing = true;
        self.done = true;
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

impl<T: Clone> Peek for ValueSource<T> {
    fn peek(&mut self) -> BoxFuture<'_, Option<T>>
    where
        T: Clone,
    {
        Box::pin(async move {
            if self.done || self.closing {
                None
            } else {
                Some(self.value.clone())
            }
        })
    }
}
