//! Push stream objects (spec.md §4.2): eager, producer-driven pipelines.
//! The producer calls `next(value)`; the base class tracks `done` and
//! each subclass decides how (and whether) to forward further.

pub mod distribute;
pub mod sink;
pub mod transform;

use std::future::Future;
use std::pin::Pin;

use crate::error::CoreError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Eager, producer-driven stream object (spec.md §4.2, §6 "Push").
///
/// `next(value)` reports whether the stream (or, for a transform, its
/// downstream) is now done. `return_`/`throw` are the graceful-close and
/// error-propagation signals; whether they actually reach a downstream
/// sink is governed by each subclass's `forward_close`/`forward_errors`
/// flags (spec.md §4.2, §5 "Cancellation").
pub trait PushObj {
    type Item;

    fn next(&mut self, value: Self::Item) -> BoxFuture<'_, bool>;

    fn return_(&mut self) -> BoxFuture<'_, ()>;

    fn throw(&mut self, err: CoreError) -> BoxFuture<'_, ()>;

    fn is_done(&self) -> bool;
}

impl<P: PushObj + ?Sized> PushObj for Box<P> {
    type Item = P::Item;

    fn next(&mut self, value: Self::Item) -> BoxFuture<'_, bool> {
        (**self).next(value)
    }

    fn return_(&mut self) -> BoxFuture<'_, ()> {
        (**self).return_()
    }

    fn throw(&mut self, err: CoreError) -> BoxFuture<'_, ()> {
        (**self).throw(err)
    }

    fn is_done(&self) -> bool {
        (**self).is_done()
    }
}

/// Type-erased push object, used by the push chain builder to store a
/// runtime-swappable sink reference (spec.md §4.3 "in-place mutation...
/// rewires sink references").
pub type BoxPush<T> = Box<dyn PushObj<Item = T>>;
