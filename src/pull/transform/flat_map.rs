use crate::pull::{BoxFuture, PullObj};

/// Apply a function returning an inner async sequence; yield every
/// element of that sequence before pulling upstream again (spec.md §4.1
/// `flatMap`).
pub struct FlatMap<P, F, Inner> {
    upstream: P,
    f: F,
    current: Option<Inner>,
}

impl<P, F, Inner> FlatMap<P, F, Inner> {
    pub fn new(upstream: P, f: F) -> Self {
        Self {
            upstream,
            f,
            current: None,
        }
    }
}

impl<P, F, Inner> PullObj for FlatMap<P, F, Inner>
where
    P: PullObj,
    F: FnMut(P::Item) -> Inner,
    Inner: PullObj,
{
    type Item = Inner::Item;

    fn next(&mut self) -> BoxFuture<'_, Option<Inner::Item>> {
        Box::pin(async move {
            loop {
                if let Some(inner) = self.current.as_mut() {
                    if let Some(v) = inner.next().await {
                        return Some(v);
                    }
                    self.current = None;
                }
                let v = self.upstream.next().await?;
                self.current = Some((self.f)(v));
            }
        })
    }

    fn close(&mut self) {
        self.upstream.close();
        if let Some(inner) = self.current.as_mut() {
            inner.close();
        }
    }

    fn close_interrupt(&mut self) {
        self.upstream.close_interrupt();
        if let Some(inner) = self.current.as_mut() {
            inner.close_interrupt();
        }
    }

    fn is_done(&self) -> bool {
        self.upstream.is_done() && self.current.is_none()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pull::source::{ArrayDrainOrder, ArraySource};

    #[tokio::test]
    async fn expands_each_value_before_pulling_again() {
        let src = ArraySource::one_shot(vec![1, 2], ArrayDrainOrder::Fifo);
        let mut fm = FlatMap::new(src, |v: i32| ArraySource::one_shot(vec![v, v * 10], ArrayDrainOrder::Fifo));
        assert_eq!(crate::pull::collect(&mut fm).await, vec![1, 10, 2, 20]);
    }
}
