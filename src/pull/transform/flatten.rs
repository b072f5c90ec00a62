use crate::pull::{BoxFuture, PullObj};

/// Input to [`Flatten`]: either a single value to pass through unchanged,
/// or a batch to drain and yield element-by-element (spec.md §4.1
/// `flatten`: "Pass non-iterables through; for iterables/async-iterables
/// drain and yield each element"). Rust has no runtime "is this iterable"
/// check, so the choice is made explicit at the type level via this enum
/// rather than guessed from `P::Item`'s shape.
pub enum FlattenItem<T> {
    Single(T),
    Many(Vec<T>),
}

pub struct Flatten<P: PullObj> {
    upstream: P,
    pending: std::collections::VecDeque<<P::Item as IntoFlat>::Out>,
}

/// Helper trait unwrapping a `FlattenItem<T>` (or any type an implementer
/// chooses to treat the same way) into its element type `Out`.
pub trait IntoFlat {
    type Out;
    fn into_flat(self) -> FlattenOutcome<Self::Out>;
}

pub enum FlattenOutcome<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> IntoFlat for FlattenItem<T> {
    type Out = T;
    fn into_flat(self) -> FlattenOutcome<T> {
        match self {
            FlattenItem::Single(v) => FlattenOutcome::One(v),
            FlattenItem::Many(v) => FlattenOutcome::Many(v),
        }
    }
}

impl<P: PullObj> Flatten<P>
where
    P::Item: IntoFlat,
{
    pub fn new(upstream: P) -> Self {
        Self {
            upstream,
            pending: std::collections::VecDeque::new(),
        }
    }
}

impl<P> PullObj for Flatten<P>
where
    P: PullObj,
    P::Item: IntoFlat,
{
    type Item = <P::Item as IntoFlat>::Out;

    fn next(&mut self) -> BoxFuture<'_, Option<Self::Item>> {
        Box::pin(async move {
            loop {
                if let Some(v) = self.pending.pop_front() {
                    return Some(v);
                }
                match self.upstream.next().await {
                    Some(item) => match item.into_flat() {
                        FlattenOutcome::One(v) => return Some(v),
                        FlattenOutcome::Many(vs) => {
                            self.pending.extend(vs);
                        }
                    },
                    None => return None,
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
        self.upstream.is_done() && self.pending.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pull::source::{ArrayDrainOrder, ArraySource};

    #[tokio::test]
    async fn drains_many_passes_single() {
        let src = ArraySource::one_shot(
            vec![
                FlattenItem::Single(1),
                FlattenItem::Many(vec![2, 3]),
                FlattenItem::Single(4),
            ],
            ArrayDrainOrder::Fifo,
        );
        let mut f = Flatten::new(src);
        assert_eq!(crate::pull::collect(&mut f).await, vec![1, 2, 3, 4]);
    }
}
