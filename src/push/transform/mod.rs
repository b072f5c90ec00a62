//! 1↔1 push transforms (spec.md §4.2 "1↔1 transforms" list).

mod buffer;
mod callback;
mod filter;
mod flat_map;
mod flatten;
mod map;
mod reduce;
mod serial;
mod signal;
mod window;
mod window_timeout;

pub use buffer::BufferCond;
pub use callback::{PostCallback, PreCallback};
pub use filter::Filter;
pub use flat_map::FlatMap;
pub use flatten::Flatten;
pub use map::Map;
pub use reduce::Reduce;
pub use serial::{Serial, SerialHandle};
pub use signal::{PostSignal, PreSignal};
pub use window::Window;
pub use window_timeout::WindowTimeout;
