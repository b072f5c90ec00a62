//! Many→1 pull combiners (spec.md §4.1 "Many→1 combiners" table).
//!
//! Each combiner owns an ordered (or labeled) set of upstream [`PullObj`]s
//! and fans them into a single stream. Termination rules vary per
//! combiner and are documented on each type; §8 "Combiner termination"
//! pins the exact behavior for `concat`/`zip`/`race`.

mod concat;
mod labeled;
mod race;
mod race_cutoff;
mod race_robin;
mod round_robin;
mod zip;

pub use concat::Concat;
pub use labeled::{KeyValue, LabeledRoundRobin, LabeledZip};
pub use race::{RacePull, RaceResult};
pub use race_cutoff::RaceCutoff;
pub use race_robin::RaceRobin;
pub use round_robin::RoundRobin;
pub use zip::Zip;
