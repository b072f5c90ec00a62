//! Signaling primitives: promise-sequence waits, rolling-window stats, and
//! monotonic/up-down counters (spec.md §4.9 uses these as the building
//! blocks for the capacity and chain collectors; §3 "Wait object" is used
//! directly by the capacity source and the pool runner).

mod counter;
mod duration;
mod rolling;
mod wait;

pub use counter::{Counter, UpDownCounter};
pub use duration::DurationTracker;
pub use rolling::{RollingStats, RollingWindow};
pub use wait::Wait;
