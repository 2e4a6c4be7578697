use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion activity.
#[derive(Default)]
pub struct IngestMetrics {
    events_received: AtomicU64,
    documents_processed: AtomicU64,
    failures_recorded: AtomicU64,
    documents_dropped: AtomicU64,
    last_document_bytes: AtomicU64,
    last_summary_bytes: AtomicU64,
}

impl IngestMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record receipt of a storage event, before validation or processing.
    pub fn record_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful pipeline run and the sizes of its outputs.
    pub fn record_processed(&self, document_bytes: u64, summary_bytes: u64) {
        self.documents_processed.fetch_add(1, Ordering::Relaxed);
        self.last_document_bytes
            .store(document_bytes, Ordering::Relaxed);
        self.last_summary_bytes.store(summary_bytes, Ordering::Relaxed);
    }

    /// Record a pipeline failure that remains eligible for redelivery.
    pub fn record_failure(&self) {
        self.failures_recorded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a resource abandoned after reaching the failure cap.
    pub fn record_drop(&self) {
        self.documents_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let last_document_bytes = self.last_document_bytes.load(Ordering::Relaxed);
        let last_summary_bytes = self.last_summary_bytes.load(Ordering::Relaxed);
        MetricsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            documents_processed: self.documents_processed.load(Ordering::Relaxed),
            failures_recorded: self.failures_recorded.load(Ordering::Relaxed),
            documents_dropped: self.documents_dropped.load(Ordering::Relaxed),
            last_document_bytes: (last_document_bytes > 0).then_some(last_document_bytes),
            last_summary_bytes: (last_summary_bytes > 0).then_some(last_summary_bytes),
        }
    }
}

/// Immutable view of ingestion counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of storage events received since startup.
    pub events_received: u64,
    /// Number of documents processed end to end.
    pub documents_processed: u64,
    /// Number of failures recorded while the resource remained retryable.
    pub failures_recorded: u64,
    /// Number of resources abandoned at the failure cap.
    pub documents_dropped: u64,
    /// Extracted text size of the most recent successful run.
    pub last_document_bytes: Option<u64>,
    /// Summary size of the most recent successful run.
    pub last_summary_bytes: Option<u64>,
}
