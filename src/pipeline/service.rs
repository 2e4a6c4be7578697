//! Pipeline service wiring extraction, summarization, and persistence together.

use crate::config::get_config;
use crate::docai::DocAiClient;
use crate::genai::{GenAiClient, SummaryModel};
use crate::metrics::{IngestMetrics, MetricsSnapshot};
use crate::pipeline::extract::{ExtractionStrategy, TextExtractor};
use crate::pipeline::retry::{FailureDisposition, RetryTracker};
use crate::pipeline::types::{
    EventEnvelope, EventError, EventOutcome, IngestionEvent, PipelineError, PipelineOutcome,
};
use crate::storage::StorageClient;
use crate::warehouse::{OutputRecord, WarehouseClient};
use async_trait::async_trait;

/// Interface the event intake surface depends on.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Validate one storage event and run the pipeline for it.
    async fn handle_event(&self, envelope: EventEnvelope) -> Result<EventOutcome, EventError>;
    /// Current ingestion counters.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Document pipeline backed by the hosted storage, recognition, model, and
/// warehouse services.
pub struct DocumentPipeline {
    extractor: TextExtractor,
    summarizer: GenAiClient,
    warehouse: WarehouseClient,
    retries: RetryTracker,
    metrics: IngestMetrics,
}

impl DocumentPipeline {
    /// Build the pipeline from the loaded configuration.
    pub fn new() -> Self {
        let config = get_config();
        let storage = StorageClient::new().expect("Failed to build storage client");
        let recognizer = DocAiClient::new().expect("Failed to build recognition client");
        let extractor = TextExtractor::new(
            storage,
            recognizer,
            config.output_bucket.clone(),
            config.ocr_fetch_concurrency,
        );

        Self {
            extractor,
            summarizer: GenAiClient::new().expect("Failed to build model client"),
            warehouse: WarehouseClient::new().expect("Failed to build warehouse client"),
            retries: RetryTracker::new(),
            metrics: IngestMetrics::new(),
        }
    }

    /// Run extraction, summarization, and persistence for one validated event.
    async fn process_document(
        &self,
        event: &IngestionEvent,
    ) -> Result<PipelineOutcome, PipelineError> {
        let strategy = ExtractionStrategy::for_content_type(event.content_type.as_deref());
        let document = self.extractor.extract(event, strategy).await?;
        let summary = self.summarizer.summarize(&document.text).await?;
        tracing::debug!(
            resource = %event.resource_key(),
            model = %summary.model_name,
            summary_bytes = summary.summary_text.len(),
            "Summary generated"
        );

        let text_bytes = document.text.len();
        let summary_bytes = summary.summary_text.len();
        let record = OutputRecord::new(
            event.event_id.clone(),
            event.time_created,
            document.source_path,
            document.text,
            summary.summary_text,
        );
        self.warehouse.insert_row(&record).await?;

        Ok(PipelineOutcome {
            resource_key: event.resource_key(),
            strategy,
            text_bytes,
            summary_bytes,
        })
    }
}

impl Default for DocumentPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PipelineApi for DocumentPipeline {
    /// Validate the envelope, run the pipeline, and apply the failure cap.
    ///
    /// Validation failures surface immediately and never touch the failure counters.
    /// Pipeline failures below the cap surface so the delivery platform redelivers;
    /// at the cap the resource is abandoned and the event acknowledged instead.
    async fn handle_event(&self, envelope: EventEnvelope) -> Result<EventOutcome, EventError> {
        self.metrics.record_received();
        let metadata = envelope.data.as_ref();
        tracing::info!(
            event_id = ?envelope.id,
            bucket = ?metadata.and_then(|object| object.bucket.as_deref()),
            object = ?metadata.and_then(|object| object.name.as_deref()),
            content_type = ?metadata.and_then(|object| object.content_type.as_deref()),
            metageneration = ?metadata.and_then(|object| object.metageneration.as_deref()),
            time_created = ?metadata.and_then(|object| object.time_created.as_deref()),
            updated = ?metadata.and_then(|object| object.updated.as_deref()),
            "Storage event received"
        );
        let event = IngestionEvent::from_envelope(envelope)?;
        let resource_key = event.resource_key();

        match self.process_document(&event).await {
            Ok(outcome) => {
                self.retries.clear(&resource_key);
                self.metrics
                    .record_processed(outcome.text_bytes as u64, outcome.summary_bytes as u64);
                tracing::info!(
                    resource = %resource_key,
                    strategy = outcome.strategy.as_str(),
                    text_bytes = outcome.text_bytes,
                    summary_bytes = outcome.summary_bytes,
                    "Document processed"
                );
                Ok(EventOutcome::Completed(outcome))
            }
            Err(error) => match self.retries.record_failure(&resource_key) {
                FailureDisposition::Retry { attempt } => {
                    self.metrics.record_failure();
                    tracing::warn!(
                        resource = %resource_key,
                        attempt,
                        error = %error,
                        "Processing failed, awaiting redelivery"
                    );
                    Err(EventError::Pipeline(error))
                }
                FailureDisposition::Drop { attempts } => {
                    self.metrics.record_drop();
                    tracing::error!(
                        resource = %resource_key,
                        attempts,
                        error = %error,
                        "Abandoning document after repeated failures"
                    );
                    Ok(EventOutcome::Dropped {
                        resource_key,
                        attempts,
                    })
                }
            },
        }
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
