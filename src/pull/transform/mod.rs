//! 1↔1 pull transforms (spec.md §4.1 "1↔1 transforms" table).

mod await_reset;
mod buffer;
mod callback;
mod dedupe;
mod eager;
mod filter;
mod flat_map;
mod flatten;
mod in_order;
mod map;
mod prefetch;
mod reduce;
mod timeout;
mod window;
mod window_timeout;

pub use await_reset::AwaitReset;
pub use buffer::BufferCond;
pub use callback::Callback;
pub use dedupe::Dedupe;
pub use eager::Eager;
pub use filter::Filter;
pub use flat_map::FlatMap;
pub use flatten::{Flatten, FlattenItem, FlattenOutcome, IntoFlat};
pub use in_order::InOrder;
pub use map::Map;
pub use reduce::Reduce;
pub use timeout::{PullTimeoutObj, TimeoutError};
pub use window::Window;
pub use window_timeout::WindowTimeout;
