use std::sync::atomic::{AtomicUsize, Ordering};

/// Снимок счетчиков пула
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub dispatched: usize,
    pub in_flight: usize,
    pub completed: usize,
    pub failed: usize,
}

impl PoolMetrics {
    pub fn success_rate(&self) -> f64 {
        let total = self.completed + self.failed;
        if total == 0 {
            return 1.0;
        }
        self.completed as f64 / total as f64
    }
}

#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub(crate) dispatched: AtomicUsize,
    pub(crate) completed: AtomicUsize,
    pub(crate) failed: AtomicUsize,
}

impl PoolCounters {
    pub(crate) fn snapshot(&self, in_flight: usize) -> PoolMetrics {
        PoolMetrics {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            in_flight,
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}
