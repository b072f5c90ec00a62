//! Chains compose pull/push/bidi objects fluently (spec.md §4.3) and,
//! for pull/push, can be handed to [`compiler`] for cardinality-aware
//! fusion (spec.md §4.4).

pub mod bidi;
pub mod compiler;
pub mod pull;
pub mod push;

pub use bidi::{BidiGenerator, BidirectionalChain};
pub use compiler::{CompiledPull, CompiledPush, PullCompileBuilder, PushCompileBuilder};
pub use pull::PullChain;
pub use push::{ArrayCollectorHandle, PushChain, PushChainBuilder};
