//! Metrics the engine posts to an external sink. The sink may be shared across worker
//! threads; per §5 it is the only cross-thread interaction the engine has, so it is updated
//! with atomic fetch-and-add rather than a lock.

use std::sync::atomic::{AtomicU64, Ordering};

/// The five metrics the engine reports. `Ckpt`/`Recovery` are counts; the `*Time` variants
/// are microseconds; `CkptMem` is bytes written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Metric {
    Ckpt,
    CkptTime,
    CkptMem,
    Recovery,
    RecoveryTime,
}

/// Receives metric postings from the engine. Implementations are expected to be cheap and
/// non-blocking: this is called on every checkpoint and restore.
pub trait StatsSink {
    fn post(&self, metric: Metric, value: u64);
}

/// A [`StatsSink`] that keeps one atomic counter per metric, safe to share across the
/// workers each owning a disjoint set of LPs. Per-thread counters that get aggregated
/// later are also an acceptable and often preferable implementation; this one favors
/// simplicity over contention-avoidance.
#[derive(Default)]
pub struct AtomicStatsSink {
    ckpt: AtomicU64,
    ckpt_time: AtomicU64,
    ckpt_mem: AtomicU64,
    recovery: AtomicU64,
    recovery_time: AtomicU64,
}

impl AtomicStatsSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, metric: Metric) -> &AtomicU64 {
        match metric {
            Metric::Ckpt => &self.ckpt,
            Metric::CkptTime => &self.ckpt_time,
            Metric::CkptMem => &self.ckpt_mem,
            Metric::Recovery => &self.recovery,
            Metric::RecoveryTime => &self.recovery_time,
        }
    }

    pub fn get(&self, metric: Metric) -> u64 {
        self.counter(metric).load(Ordering::Relaxed)
    }
}

impl StatsSink for AtomicStatsSink {
    fn post(&self, metric: Metric, value: u64) {
        self.counter(metric).fetch_add(value, Ordering::Relaxed);
    }
}

/// A sink that drops every posting, for callers that have no use for the metrics.
pub struct NullStatsSink;

impl StatsSink for NullStatsSink {
    fn post(&self, _metric: Metric, _value: u64) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_independently() {
        let sink = AtomicStatsSink::new();
        sink.post(Metric::Ckpt, 1);
        sink.post(Metric::Ckpt, 1);
        sink.post(Metric::CkptMem, 128);
        assert_eq!(sink.get(Metric::Ckpt), 2);
        assert_eq!(sink.get(Metric::CkptMem), 128);
        assert_eq!(sink.get(Metric::Recovery), 0);
    }
}
