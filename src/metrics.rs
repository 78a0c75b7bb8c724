use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing upload activity.
#[derive(Default)]
pub struct IntakeMetrics {
    files_processed: AtomicU64,
    files_failed: AtomicU64,
    jobs_persisted: AtomicU64,
    archive_entries_extracted: AtomicU64,
}

impl IntakeMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file whose processing finished without a per-file error.
    pub fn record_file(&self) {
        self.files_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a file whose processing was folded into an error field.
    pub fn record_failed_file(&self) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a job folder whose metadata record was written.
    pub fn record_job(&self) {
        self.jobs_persisted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the number of entries materialized from an archive.
    pub fn record_archive_entries(&self, count: u64) {
        self.archive_entries_extracted
            .fetch_add(count, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files_processed: self.files_processed.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            jobs_persisted: self.jobs_persisted.load(Ordering::Relaxed),
            archive_entries_extracted: self.archive_entries_extracted.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of upload counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Files processed without a per-file error since startup.
    pub files_processed: u64,
    /// Files whose processing recorded an error.
    pub files_failed: u64,
    /// Job folders whose metadata record was persisted.
    pub jobs_persisted: u64,
    /// Total entries extracted from uploaded archives.
    pub archive_entries_extracted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_files_jobs_and_entries() {
        let metrics = IntakeMetrics::new();
        metrics.record_file();
        metrics.record_file();
        metrics.record_failed_file();
        metrics.record_job();
        metrics.record_archive_entries(3);
        metrics.record_archive_entries(2);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.files_processed, 2);
        assert_eq!(snapshot.files_failed, 1);
        assert_eq!(snapshot.jobs_persisted, 1);
        assert_eq!(snapshot.archive_entries_extracted, 5);
    }

    #[test]
    fn snapshot_starts_empty() {
        let snapshot = IntakeMetrics::new().snapshot();
        assert_eq!(snapshot.files_processed, 0);
        assert_eq!(snapshot.jobs_persisted, 0);
    }
}
