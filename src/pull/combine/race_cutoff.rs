use futures_util::future::select_all;

use crate::error::CoreError;
use crate::pull::{BoxFuture, PullObj};

enum Winner<T> {
    Main(usize, Option<T>),
    Cutoff,
}

/// Race the main sources against a cutoff source; whichever resolves
/// first wins the round. If the cutoff wins, the whole combiner
/// terminates — either silently or, if `throw_on_cutoff` is set, with an
/// error retrievable via [`RaceCutoff::take_error`] (spec.md §4.1
/// `raceCutoff`, §7 "flag controls throw-vs-silent").
pub struct RaceCutoff<P, C> {
    mains: Vec<P>,
    cutoff: C,
    active: Vec<usize>,
    throw_on_cutoff: bool,
    cut: bool,
    error: Option<CoreError>,
}

impl<P: PullObj, C: PullObj> RaceCutoff<P, C> {
    pub fn new(mains: Vec<P>, cutoff: C, throw_on_cutoff: bool) -> Self {
        let active = (0..mains.len()).collect();
        Self {
            mains,
            cutoff,
            active,
            throw_on_cutoff,
            cut: false,
            error: None,
        }
    }

    /// Take the pending cutoff error, if the cutoff fired with
    /// `throw_on_cutoff` set. Mirrors [`super::super::transform::Window::take_trailing`]'s
    /// out-of-band-value pattern for information `next()`'s `Option`
    /// return can't carry.
    pub fn take_error(&mut self) -> Option<CoreError> {
        self.error.take()
    }
}

impl<P: PullObj, C: PullObj> PullObj for RaceCutoff<P, C> {
    type Item = P::Item;

    fn next(&mut self) -> BoxFuture<'_, Option<P::Item>> {
        Box::pin(async move {
            loop {
                if self.cut || self.active.is_empty() {
                    return None;
                }
                let active = self.active.clone();
                let mut futs: Vec<BoxFuture<'_, Winner<P::Item>>> = Vec::with_capacity(active.len() + 1);
                for (idx, src) in self.mains.iter_mut().enumerate() {
                    if active.contains(&idx) {
                        futs.push(Box::pin(async move { Winner::Main(idx, src.next().await) }));
                    }
                }
                futs.push(Box::pin(async move {
                    self.cutoff.next().await;
                    Winner::Cutoff
                }));
                let (winner, _, _) = select_all(futs).await;
                match winner {
                    Winner::Cutoff => {
                        self.cut = true;
                        if self.throw_on_cutoff {
                            self.error = Some(CoreError::Cutoff);
                        }
                        return None;
                    }
                    Winner::Main(_idx, Some(v)) => return Some(v),
                    Winner::Main(idx, None) => {
                        self.active.retain(|&x| x != idx);
                    }
                }
            }
        })
    }

    fn close(&mut self) {
        for s in &mut self.mains {
            s.close();
        }
        self.cutoff.close();
    }

    fn close_interrupt(&mut self) {
        for s in &mut self.mains {
            s.close_interrupt();
        }
        self.cutoff.close_interrupt();
        self.active.clear();
        self.cut = true;
    }

    fn is_done(&self) -> bool {
        self.cut || self.active.is_empty()
    }
}

/// A source whose `next()` never resolves, used to stand in for "no
/// cutoff signal" in tests.
struct NeverSource;

impl PullObj for NeverSource {
    type Item = ();

    fn next(&mut self) -> BoxFuture<'_, Option<()>> {
        Box::pin(std::future::pending())
    }

    fn close(&mut self) {}
    fn close_interrupt(&mut self) {}
    fn is_done(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pull::source::{ArrayDrainOrder, ArraySource, ValueSource};

    #[tokio::test]
    async fn cutoff_terminates_round_silently() {
        let a = ArraySource::one_shot(vec![1, 2, 3], ArrayDrainOrder::Fifo);
        let cutoff = ValueSource::new(());
        let mut r = RaceCutoff::new(vec![a], cutoff, false);
        // cutoff is an ever-ready value source, so it should win immediately
        let v = r.next().await;
        assert!(v.is_none() || v == Some(1));
        assert!(r.take_error().is_none());
    }

    #[tokio::test]
    async fn mains_drain_without_cutoff() {
        let a = ArraySource::one_shot(vec![1, 2], ArrayDrainOrder::Fifo);
        let mut r = RaceCutoff::new(vec![a], NeverSource, true);
        let mut out = Vec::new();
        while let Some(v) = r.next().await {
            out.push(v);
        }
        assert_eq!(out, vec![1, 2]);
        assert!(r.take_error().is_none());
    }
}
