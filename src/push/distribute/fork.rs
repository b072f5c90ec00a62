use crate::error::CoreError;
use crate::push::{BoxFuture, PushObj};

/// Broadcast every pushed value to every sink (spec.md §4.2 `fork`). No
/// cloning of the value's *data* happens here beyond `Clone::clone` on
/// `S::Item` itself — callers who need every branch to observe the same
/// underlying reference (spec.md §8 "a mutation visible to one branch is
/// visible to others") should instantiate `S::Item` as an `Rc<RefCell<_>>`
/// or similar, so the clone is a reference clone, not a deep copy.
///
/// When a sink returns done it is removed from the active set (spec.md
/// §4.2 "that sink is removed from the active set"); the fork itself
/// reports done once its last active sink is done.
pub struct PushForkObj<S> {
    sinks: Vec<S>,
    active: Vec<bool>,
}

impl<S: PushObj> PushForkObj<S> {
    pub fn new(sinks: Vec<S>) -> Self {
        let active = vec![true; sinks.len()];
        Self { sinks, active }
    }
}

impl<S> PushObj for PushForkObj<S>
where
    S: PushObj,
    S::Item: Clone,
{
    type Item = S::Item;

    fn next(&mut self, value: S::Item) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            for (sink, active) in self.sinks.iter_mut().zip(self.active.iter_mut()) {
                if *active {
                    let done = sink.next(value.clone()).await;
                    if done {
                        *active = false;
                    }
                }
            }
            self.is_done()
        })
    }

    fn return_(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            for (sink, active) in self.sinks.iter_mut().zip(self.active.iter_mut()) {
                if *active {
                    sink.return_().await;
                    *active = false;
                }
            }
        })
    }

    fn throw(&mut self, err: CoreError) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            for (sink, active) in self.sinks.iter_mut().zip(self.active.iter_mut()) {
                if *active {
                    // `err` isn't `Clone`; every branch but the last gets
                    // a reconstructed equivalent via `Display`/message,
                    // matching the non-cloneable-error reality of a
                    // broadcast fan-out.
                    sink.throw(CoreError::stage(std::io::Error::other(err.to_string()))).await;
                }
            }
        })
    }

    fn is_done(&self) -> bool {
        self.active.iter().all(|a| !a)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::push::sink::ArrayCollector;

    #[tokio::test]
    async fn broadcasts_to_every_sink() {
        let mut f = PushForkObj::new(vec![ArrayCollector::new(), ArrayCollector::new()]);
        f.next(1).await;
        f.next(2).await;
        assert_eq!(f.sinks[0].buffer(), &[1, 2]);
        assert_eq!(f.sinks[1].buffer(), &[1, 2]);
    }

    #[tokio::test]
    async fn one_sink_done_does_not_stop_the_other() {
        struct OneShot {
            fired: bool,
        }
        impl PushObj for OneShot {
            type Item = i32;
            fn next(&mut self, _value: i32) -> BoxFuture<'_, bool> {
                Box::pin(async move {
                    self.fired = true;
                    true
                })
            }
            fn return_(&mut self) -> BoxFuture<'_, ()> {
                Box::pin(async move {})
            }
            fn throw(&mut self, _err: CoreError) -> BoxFuture<'_, ()> {
                Box::pin(async move {})
            }
            fn is_done(&self) -> bool {
                self.fired
            }
        }

        let a: Box<dyn PushObj<Item = i32>> = Box::new(OneShot { fired: false });
        let b: Box<dyn PushObj<Item = i32>> = Box::new(ArrayCollector::new());
        let mut f = PushForkObj::new(vec![a, b]);
        f.next(1).await;
        assert!(!f.is_done());
        f.next(2).await;
        assert!(f.sinks[0].is_done());
        assert!(!f.sinks[1].is_done());
    }
}
