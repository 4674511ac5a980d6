//! Per-log counters
//!
//! Observational only: nothing in the write or recovery path reads them back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Atomic counters owned by one open log handle
#[derive(Debug, Default)]
pub struct WalMetrics {
    write_count: AtomicU64,
    sync_count: AtomicU64,
    bytes_written: AtomicU64,
    corruptions: AtomicU64,
    /// Unix time of the last sync, in nanoseconds (0 = never)
    last_sync_time: AtomicU64,
}

/// Point-in-time copy of [`WalMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub write_count: u64,
    pub sync_count: u64,
    pub bytes_written: u64,
    pub corruptions: u64,
    pub last_sync_time: u64,
}

impl WalMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_write(&self, bytes: u64) {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_sync(&self) {
        self.sync_count.fetch_add(1, Ordering::Relaxed);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        self.last_sync_time.store(now, Ordering::Relaxed);
    }

    pub(crate) fn record_corruption(&self) {
        self.corruptions.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            write_count: self.write_count.load(Ordering::Relaxed),
            sync_count: self.sync_count.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            corruptions: self.corruptions.load(Ordering::Relaxed),
            last_sync_time: self.last_sync_time.load(Ordering::Relaxed),
        }
    }
}
