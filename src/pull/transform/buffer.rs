use crate::pull::{BoxFuture, PullObj};

/// Collect values until `cond` returns `true` over the accumulated
/// buffer, then flush the whole buffer as one yielded `Vec` (spec.md §4.1
/// `buffer(cond)`). A trailing buffer that never satisfies `cond` before
/// upstream exhausts is returned (not yielded), same trailing-drop
/// convention as [`super::Window`].
pub struct BufferCond<P: PullObj, F> {
    upstream: P,
    cond: F,
    pending: Vec<P::Item>,
    trailing: Option<Vec<P::Item>>,
}

impl<P: PullObj, F> BufferCond<P, F>
where
    F: FnMut(&[P::Item]) -> bool,
{
    pub fn new(upstream: P, cond: F) -> Self {
        Self {
            upstream,
            cond,
            pending: Vec::new(),
            trailing: None,
        }
    }

    pub fn take_trailing(&mut self) -> Option<Vec<P::Item>> {
        self.trailing.take()
    }
}

impl<P, F> PullObj for BufferCond<P, F>
where
    P: PullObj,
    F: FnMut(&[P::Item]) -> bool,
{
    type Item = Vec<P::Item>;

    fn next(&mut self) -> BoxFuture<'_, Option<Vec<P::Item>>> {
        Box::pin(async move {
            loop {
                match self.upstream.next().await {
                    Some(v) => {
                        self.pending.push(v);
                        if (self.cond)(&self.pending) {
                            return Some(std::mem::take(&mut self.pending));
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
    async fn flushes_when_cond_met() {
        let src = ArraySource::one_shot(vec![1, 2, 3, 10, 4], ArrayDrainOrder::Fifo);
        let mut b = BufferCond::new(src, |buf: &[i32]| buf.iter().sum::<i32>() >= 6);
        assert_eq!(crate::pull::collect(&mut b).await, vec![vec![1, 2, 3], vec![10]]);
        assert_eq!(b.take_trailing(), Some(vec![4]));
    }
}
