use crate::pull::{BoxFuture, PullObj};

/// Invoke a side-effect closure per value, passing the value through
/// unchanged (spec.md §4.1 `callback`).
pub struct Callback<P, F> {
    upstream: P,
    f: F,
}

impl<P, F> Callback<P, F> {
    pub fn new(upstream: P, f: F) -> Self {
        Self { upstream, f }
    }
}

impl<P, F> PullObj for Callback<P, F>
where
    P: PullObj,
    F: FnMut(&P::Item),
{
    type Item = P::Item;

    fn next(&mut self) -> BoxFuture<'_, Option<P::Item>> {
        Box::pin(async move {
            let v = self.upstream.next().await?;
            (self.f)(&v);
            Some(v)
        })
    }

    fn close(&mut self) {
        self.upstream.close();
    }

    fn close_interrupt(&mut self) {
        self.upstream.close_interrupt();
    }

    fn is_done(&self) -> bool {
        self.upstream.is_done()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pull::source::{ArrayDrainOrder, ArraySource};
    use std::cell::RefCell;

    #[tokio::test]
    async fn invokes_side_effect_and_passes_through() {
        let src = ArraySource::one_shot(vec![1, 2, 3], ArrayDrainOrder::Fifo);
        let seen = RefCell::new(Vec::new());
        let mut c = Callback::new(src, |v: &i32| seen.borrow_mut().push(*v));
        assert_eq!(crate::pull::collect(&mut c).await, vec![1, 2, 3]);
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }
}
