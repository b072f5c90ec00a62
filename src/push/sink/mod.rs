//! Terminal push sinks (spec.md §4.2 "Terminal sinks").

mod array_collector;
mod callback;

pub use array_collector::ArrayCollector;
pub use callback::CallbackSink;
