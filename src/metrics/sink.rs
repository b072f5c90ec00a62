//! The optional bridge interface collectors report through (spec.md
//! §4.9 "Sink", §6 "Metrics sink").
//!
//! Grounded on `xitca-service`'s object-safety-via-manual-boxing
//! approach (`service/src/object.rs`'s `ServiceObject`): a trait with a
//! `Box<dyn _>` alias and a blanket impl for the box, the same shape
//! already used by [`crate::pull::PullObj`] and [`crate::push::PushObj`]
//! for `Box<dyn _>` composition.

use std::collections::BTreeMap;

/// One attribute value (spec.md §6 "Attributes are `Record<string,
/// string|number|boolean>`").
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Num(f64),
    Bool(bool),
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        Self::Num(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

pub type Attrs = BTreeMap<String, AttrValue>;

pub fn attrs<const N: usize>(pairs: [(&str, AttrValue); N]) -> Attrs {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Fire-and-forget metrics bridge. Every method must never be allowed to
/// affect the data path: collectors call these from inside `Drop`-free,
/// non-fallible contexts and swallow any internal failure rather than
/// propagate it (spec.md §9 "Observability isolation").
pub trait MetricsSink {
    fn counter(&self, name: &str, delta: f64, attrs: &Attrs);

    fn gauge(&self, name: &str, value: f64, attrs: &Attrs);

    fn duration(&self, name: &str, ms: f64, attrs: &Attrs);

    /// Optional: a point-in-time snapshot dump, left to the sink to
    /// define the shape of.
    fn snapshot(&self, _snapshot: &str) {}

    fn flush(&self) {}
}

impl<S: MetricsSink + ?Sized> MetricsSink for Box<S> {
    fn counter(&self, name: &str, delta: f64, attrs: &Attrs) {
        (**self).counter(name, delta, attrs);
    }

    fn gauge(&self, name: &str, value: f64, attrs: &Attrs) {
        (**self).gauge(name, value, attrs);
    }

    fn duration(&self, name: &str, ms: f64, attrs: &Attrs) {
        (**self).duration(name, ms, attrs);
    }

    fn snapshot(&self, snapshot: &str) {
        (**self).snapshot(snapshot);
    }

    fn flush(&self) {
        (**self).flush();
    }
}

pub type BoxMetricsSink = Box<dyn MetricsSink>;

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingSink {
        counters: RefCell<Vec<(String, f64)>>,
    }

    impl MetricsSink for RecordingSink {
        fn counter(&self, name: &str, delta: f64, _attrs: &Attrs) {
            self.counters.borrow_mut().push((name.to_string(), delta));
        }

        fn gauge(&self, _name: &str, _value: f64, _attrs: &Attrs) {}

        fn duration(&self, _name: &str, _ms: f64, _attrs: &Attrs) {}
    }

    #[test]
    fn boxed_sink_forwards_calls() {
        let sink: BoxMetricsSink = Box::new(RecordingSink::default());
        sink.counter("x", 1.0, &Attrs::new());
        sink.counter("x", 2.0, &attrs([("unit", AttrValue::from("ms"))]));
    }
}
