//! Observability (spec.md §4.9): a sink trait collectors can optionally
//! bridge through, plus the capacity and chain collectors themselves.

pub mod capacity;
pub mod chain;
pub mod sink;

pub use capacity::{CapacityCollector, CapacityRates, CapacityTotals};
pub use chain::{ChainCollector, CorrelationMode, SectionStats, SectionStatus, SectionToken};
pub use sink::{attrs, AttrValue, Attrs, BoxMetricsSink, MetricsSink};
