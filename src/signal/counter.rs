use std::cell::Cell;
use std::rc::Rc;

/// Monotonic counter (spec.md §4.9 primitive (a)): `add` only accepts
/// non-negative deltas, `value` reads the current total, `reset` zeroes it.
///
/// Grounded on `xitca-server`'s `worker/counter.rs` `Counter`
/// (`Rc<Cell<usize>>`), widened from `usize` to `u64` since metrics totals
/// are not bounded by a connection-limit-sized domain.
#[derive(Clone)]
pub struct Counter(Rc<Cell<u64>>);

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

impl Counter {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(0)))
    }

    /// Add `delta` to the counter. A negative-intent caller should use
    /// [`UpDownCounter`] instead; `delta` here is taken as an absolute
    /// non-negative amount.
    pub fn add(&self, delta: u64) {
        self.0.set(self.0.get() + delta);
    }

    pub fn value(&self) -> u64 {
        self.0.get()
    }

    pub fn reset(&self) {
        self.0.set(0);
    }
}

/// Up-down gauge (spec.md §4.9 primitive (b)): tracks per-resource
/// in-flight counts (acquire increments, release decrements) the way the
/// capacity collector's "per-resource in-flight" figure is derived.
///
/// Grounded on the same `Counter`/`CounterGuard` RAII shape, generalized
/// to signed deltas since a gauge can both rise and fall.
#[derive(Clone)]
pub struct UpDownCounter(Rc<Cell<i64>>);

impl Default for UpDownCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl UpDownCounter {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(0)))
    }

    pub fn add(&self, delta: i64) {
        self.0.set(self.0.get() + delta);
    }

    pub fn value(&self) -> i64 {
        self.0.get()
    }

    pub fn reset(&self) {
        self.0.set(0);
    }

    /// RAII guard that increments on creation and decrements on drop,
    /// mirroring `xitca-server`'s `CounterGuard`.
    pub fn guard(&self) -> UpDownGuard {
        self.add(1);
        UpDownGuard(self.clone())
    }
}

pub struct UpDownGuard(UpDownCounter);

impl Drop for UpDownGuard {
    fn drop(&mut self) {
        self.0.add(-1);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn monotonic_counter() {
        let counter = Counter::new();
        counter.add(3);
        counter.add(4);
        assert_eq!(counter.value(), 7);
        counter.reset();
        assert_eq!(counter.value(), 0);
    }

    #[test]
    fn up_down_guard() {
        let gauge = UpDownCounter::new();
        let g1 = gauge.guard();
        let g2 = gauge.guard();
        assert_eq!(gauge.value(), 2);
        drop(g2);
        assert_eq!(gauge.value(), 1);
        drop(g1);
        assert_eq!(gauge.value(), 0);
    }
}
