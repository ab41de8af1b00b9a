use std::sync::atomic::{AtomicU64, Ordering};

/// Per-module task counters, cheap enough to keep always-on.
#[derive(Debug, Default)]
pub struct TaskMetrics {
    pub validate_errors: AtomicU64,
    pub select_errors: AtomicU64,
    pub dispatch_attempts: AtomicU64,
    pub dispatch_errors: AtomicU64,
    pub pre_read_attempts: AtomicU64,
    pub pre_read_errors: AtomicU64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskMetricsSnapshot {
    pub validate_errors: u64,
    pub select_errors: u64,
    pub dispatch_attempts: u64,
    pub dispatch_errors: u64,
    pub pre_read_attempts: u64,
    pub pre_read_errors: u64,
}

impl TaskMetrics {
    pub fn snapshot(&self) -> TaskMetricsSnapshot {
        TaskMetricsSnapshot {
            validate_errors: self.validate_errors.load(Ordering::Relaxed),
            select_errors: self.select_errors.load(Ordering::Relaxed),
            dispatch_attempts: self.dispatch_attempts.load(Ordering::Relaxed),
            dispatch_errors: self.dispatch_errors.load(Ordering::Relaxed),
            pre_read_attempts: self.pre_read_attempts.load(Ordering::Relaxed),
            pre_read_errors: self.pre_read_errors.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}
