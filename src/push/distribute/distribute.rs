use crate::error::CoreError;
use crate::push::{BoxFuture, PushObj};

/// Route each pushed value to a single sink chosen by `selector`
/// (spec.md §4.2 `distribute(selector→index)`). An out-of-range index is
/// treated as routing to a sink that is already done: the value is
/// dropped and the distributor keeps running, mirroring §7's "silently
/// ignored" default for unknown routing targets without an explicit
/// throw flag.
pub struct Distribute<S, F> {
    sinks: Vec<S>,
    selector: F,
    done: Vec<bool>,
}

impl<S: PushObj, F> Distribute<S, F> {
    pub fn new(sinks: Vec<S>, selector: F) -> Self {
        let done = vec![false; sinks.len()];
        Self { sinks, selector, done }
    }
}

impl<S, F> PushObj for Distribute<S, F>
where
    S: PushObj,
    F: FnMut(&S::Item) -> usize,
{
    type Item = S::Item;

    fn next(&mut self, value: S::Item) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            let idx = (self.selector)(&value);
            if let Some(sink) = self.sinks.get_mut(idx) {
                if !self.done[idx] {
                    self.done[idx] = sink.next(value).await;
                }
            }
            self.is_done()
        })
    }

    fn return_(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            for (sink, done) in self.sinks.iter_mut().zip(self.done.iter_mut()) {
                if !*done {
                    sink.return_().await;
                    *done = true;
                }
            }
        })
    }

    fn throw(&mut self, err: CoreError) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            for (sink, done) in self.sinks.iter_mut().zip(self.done.iter()) {
                if !*done {
                    sink.throw(CoreError::stage(std::io::Error::other(err.to_string()))).await;
                }
            }
        })
    }

    fn is_done(&self) -> bool {
        self.done.iter().all(|d| *d)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::push::sink::ArrayCollector;

    #[tokio::test]
    async fn routes_by_selector() {
        let mut d = Distribute::new(
            vec![ArrayCollector::new(), ArrayCollector::new()],
            |v: &i32| (*v % 2) as usize,
        );
        for v in [1, 2, 3, 4] {
            d.next(v).await;
        }
        assert_eq!(d.sinks[0].buffer(), &[2, 4]);
        assert_eq!(d.sinks[1].buffer(), &[1, 3]);
    }
}
