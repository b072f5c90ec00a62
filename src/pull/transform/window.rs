use crate::pull::{BoxFuture, PullObj};

/// Yield fixed-size arrays of `n` values; a partial trailing window (fewer
/// than `n` items when upstream exhausts) is **not** yielded — it is held
/// as the generator's return value, retrievable via
/// [`Window::take_trailing`] (spec.md §4.1 `window(n)`, tested in §8:
/// "trailing `[5]` is the generator return, not yielded").
pub struct Window<P: PullObj> {
    upstream: P,
    size: usize,
    pending: Vec<P::Item>,
    trailing: Option<Vec<P::Item>>,
}

impl<P: PullObj> Window<P> {
    pub fn new(upstream: P, size: usize) -> Self {
        assert!(size > 0, "window size must be positive");
        Self {
            upstream,
            size,
            pending: Vec::with_capacity(size),
            trailing: None,
        }
    }

    /// Retrieve the partial trailing window left over when upstream
    /// exhausted mid-window, if any. Mirrors the generator `return` value
    /// a `for await...of` loop would observe in the source language.
    pub fn take_trailing(&mut self) -> Option<Vec<P::Item>> {
        self.trailing.take()
    }
}

impl<P: PullObj> PullObj for Window<P> {
    type Item = Vec<P::Item>;

    fn next(&mut self) -> BoxFuture<'_, Option<Vec<P::Item>>> {
        Box::pin(async move {
            loop {
                match self.upstream.next().await {
                    Some(v) => {
                        self.pending.push(v);
                        if self.pending.len() == self.size {
                            return Some(std::mem::replace(&mut self.pending, Vec::with_capacity(self.size)));
                        }
                    }
                    None => {
                        if !self.pending.is_empty() {
                            self.trailing = Some(std::mem::take(&mut self.pending));
                        }
                        return None;
                    }
                }
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
    async fn full_windows_only_yielded() {
        let src = ArraySource::one_shot(vec![1, 2, 3, 4, 5], ArrayDrainOrder::Fifo);
        let mut w = Window::new(src, 2);
        assert_eq!(crate::pull::collect(&mut w).await, vec![vec![1, 2], vec![3, 4]]);
        assert_eq!(w.take_trailing(), Some(vec![5]));
    }
}
