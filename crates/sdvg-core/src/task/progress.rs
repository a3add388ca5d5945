//! Task progress counters, read lock-free by whoever renders them.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct Progress {
    total: AtomicU64,
    generated: AtomicU64,
}

/// A point-in-time copy for rendering or the status endpoint.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub total: u64,
    pub generated: u64,
}

impl Progress {
    pub fn new() -> Progress {
        Progress::default()
    }

    pub fn add_total(&self, rows: u64) {
        self.total.fetch_add(rows, Ordering::SeqCst);
    }

    pub fn add_generated(&self, rows: u64) {
        self.generated.fetch_add(rows, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total: self.total.load(Ordering::SeqCst),
            generated: self.generated.load(Ordering::SeqCst),
        }
    }
}
