use crate::pull::{BoxFuture, Peek, PullObj};
use crate::signal::Wait;

/// Require a gating signal before each drain cycle; must combine with a
/// [`Peek`]-capable source so a cycle boundary can be detected without
/// triggering the source's automatic refill (spec.md §4.1 `awaitReset`).
///
/// One gate signal ([`AwaitReset::trigger`]) is consumed per cycle: once
/// the upstream's queue empties (observed via `peek`, which — unlike
/// `next` — does not itself cause an `ArraySource` to refill) the gate
/// must fire again before another value is drained.
pub struct AwaitReset<P> {
    upstream: P,
    gate: Wait<(), ()>,
    armed: bool,
}

impl<P: Peek> AwaitReset<P> {
    pub fn new(upstream: P) -> Self {
        Self {
            upstream,
            gate: Wait::new(),
            armed: false,
        }
    }

    /// Signal that a new drain cycle may begin.
    pub fn trigger(&self) {
        self.gate.resolve(());
    }

    /// A cloneable handle sharing the same gate, so a caller can retain
    /// trigger access after this object is boxed away behind `PullObj`
    /// (e.g. once it's folded into a type-erased [`crate::pull::BoxPull`]
    /// chain stage, which no longer exposes `trigger` directly).
    pub fn handle(&self) -> Wait<(), ()> {
        self.gate.clone()
    }
}

impl<P> PullObj for AwaitReset<P>
where
    P: Peek,
    P::Item: Clone,
{
    type Item = P::Item;

    fn next(&mut self) -> BoxFuture<'_, Option<P::Item>> {
        Box::pin(async move {
            loop {
                if !self.armed {
                    if self.gate.wait().await.is_err() {
                        return None;
                    }
                    self.armed = true;
                }
                if self.upstream.peek().await.is_none() {
                    self.armed = false;
                    continue;
                }
                return self.upstream.next().await;
            }
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

    #[tokio::test]
    async fn blocks_until_gate_then_drains_one_cycle() {
        let src = ArraySource::new(vec![1, 2], ArrayDrainOrder::Fifo);
        let mut ar = AwaitReset::new(src);
        ar.trigger();
        assert_eq!(ar.next().await, Some(1));
        assert_eq!(ar.next().await, Some(2));
        // cycle boundary hit (peek sees nothing queued); needs a new gate
        let fut = ar.next();
        tokio::pin!(fut);
        assert!(futures_util::poll!(&mut fut).is_pending());
        ar.trigger();
        assert_eq!(fut.await, Some(1));
    }
}
