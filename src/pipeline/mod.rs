//! Event-driven document pipeline.
//!
//! A storage notification enters through [`PipelineApi::handle_event`], is validated
//! into an [`IngestionEvent`], and then flows through extraction, summarization, and
//! persistence. Failures are counted per resource by [`RetryTracker`]; a resource that
//! keeps failing is abandoned once the cap is reached.

pub mod extract;
pub mod retry;
pub mod service;
pub mod types;

pub use extract::{ExtractionStrategy, TextExtractor};
pub use retry::{DEFAULT_MAX_FAILURES, FailureDisposition, RetryTracker};
pub use service::{DocumentPipeline, PipelineApi};
pub use types::{
    EventEnvelope, EventError, EventOutcome, ExtractedDocument, ExtractionError, IngestionEvent,
    ObjectMetadata, PipelineError, PipelineOutcome, ValidationError,
};
