//! Shared plumbing for transforms that need to keep pulling from upstream
//! independently of whatever the downstream consumer is currently awaiting
//! ([`Eager`](super::Eager), [`PullTimeoutObj`](super::PullTimeoutObj),
//! [`WindowTimeout`](super::WindowTimeout)).
//!
//! A background `tokio::task::spawn_local` owns the upstream pull object
//! and feeds a bounded `mpsc` channel. Because it is a genuinely separate
//! local task, races against it (a timer, a bounded buffer) never cancel
//! the upstream `next()` call that is in flight when the race is lost —
//! which is precisely the documented, intentional behavior of
//! `PullTimeoutObj` (spec.md §4.1 `timeout`, §9 "does not cancel pending
//! `next()` calls").

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::pull::PullObj;

pub(super) struct Prefetcher<T> {
    rx: mpsc::Receiver<T>,
    _handle: JoinHandle<()>,
}

impl<T: 'static> Prefetcher<T> {
    pub(super) fn spawn<P>(mut upstream: P, depth: usize) -> Self
    where
        P: PullObj<Item = T> + 'static,
    {
        let (tx, rx) = mpsc::channel(depth.max(1));
        let handle = tokio::task::spawn_local(async move {
            loop {
                match upstream.next().await {
                    Some(v) => {
                        if tx.send(v).await.is_err() {
                            return;
                        }
                    }
                    None => return,
                }
            }
        });
        Self { rx, _handle: handle }
    }

    pub(super) async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}
