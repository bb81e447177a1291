use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion activity.
#[derive(Default)]
pub struct IngestionMetrics {
    files_processed: AtomicU64,
    files_skipped: AtomicU64,
    files_errored: AtomicU64,
}

impl IngestionMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file that was stored and summarized.
    pub fn record_processed(&self) {
        self.files_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a file that was skipped (unsupported, invalid, or duplicate).
    pub fn record_skipped(&self) {
        self.files_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a file whose processing failed.
    pub fn record_errored(&self) {
        self.files_errored.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files_processed: self.files_processed.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            files_errored: self.files_errored.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of ingestion counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Files processed since startup.
    pub files_processed: u64,
    /// Files skipped since startup.
    pub files_skipped: u64,
    /// Files that failed since startup.
    pub files_errored: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_each_bucket_independently() {
        let metrics = IngestionMetrics::new();
        metrics.record_processed();
        metrics.record_processed();
        metrics.record_skipped();
        metrics.record_errored();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.files_processed, 2);
        assert_eq!(snapshot.files_skipped, 1);
        assert_eq!(snapshot.files_errored, 1);
    }

    #[test]
    fn snapshot_starts_at_zero() {
        let snapshot = IngestionMetrics::new().snapshot();
        assert_eq!(
            snapshot,
            MetricsSnapshot {
                files_processed: 0,
                files_skipped: 0,
                files_errored: 0,
            }
        );
    }
}
