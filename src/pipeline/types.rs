//! Core data types and error definitions for the document pipeline.

use crate::docai::DocAiError;
use crate::genai::SummarizeError;
use crate::pipeline::extract::ExtractionStrategy;
use crate::storage::StorageError;
use crate::warehouse::PersistError;
use serde::Deserialize;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

/// Envelope delivered by the storage notification endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct EventEnvelope {
    /// Event identifier assigned by the delivery platform.
    #[serde(default)]
    pub id: Option<String>,
    /// Metadata of the object that triggered the notification.
    #[serde(default)]
    pub data: Option<ObjectMetadata>,
}

/// Object metadata carried inside a storage notification.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    /// Bucket holding the object.
    #[serde(default)]
    pub bucket: Option<String>,
    /// Object name within the bucket.
    #[serde(default)]
    pub name: Option<String>,
    /// MIME type recorded for the object.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Metadata generation counter of the object.
    #[serde(default)]
    pub metageneration: Option<String>,
    /// Creation timestamp of the object, RFC3339.
    #[serde(default)]
    pub time_created: Option<String>,
    /// Last-update timestamp of the object, RFC3339.
    #[serde(default)]
    pub updated: Option<String>,
}

/// Validated storage event driving one pipeline run.
#[derive(Debug, Clone)]
pub struct IngestionEvent {
    /// Event identifier, generated locally when the envelope omitted one.
    pub event_id: String,
    /// Bucket holding the source object.
    pub bucket: String,
    /// Source object name within the bucket.
    pub object_name: String,
    /// MIME type recorded for the object, when known.
    pub content_type: Option<String>,
    /// Upload timestamp, when present and parseable.
    pub time_created: Option<OffsetDateTime>,
}

impl IngestionEvent {
    /// Validate an envelope into an event, requiring bucket and object name.
    pub fn from_envelope(envelope: EventEnvelope) -> Result<Self, ValidationError> {
        let data = envelope
            .data
            .ok_or(ValidationError::MissingField("data"))?;
        let bucket = data
            .bucket
            .filter(|value| !value.is_empty())
            .ok_or(ValidationError::MissingField("bucket"))?;
        let object_name = data
            .name
            .filter(|value| !value.is_empty())
            .ok_or(ValidationError::MissingField("name"))?;

        let event_id = envelope
            .id
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let time_created = data.time_created.and_then(|raw| {
            match OffsetDateTime::parse(&raw, &Rfc3339) {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    tracing::debug!(value = %raw, error = %err, "Ignoring unparseable timeCreated");
                    None
                }
            }
        });

        Ok(Self {
            event_id,
            bucket,
            object_name,
            content_type: data.content_type,
            time_created,
        })
    }

    /// Key identifying this bucket and object pair for retry tracking.
    pub fn resource_key(&self) -> String {
        format!("{}/{}", self.bucket, self.object_name)
    }

    /// Source object location in `gs://bucket/object` form.
    pub fn source_uri(&self) -> String {
        format!("gs://{}/{}", self.bucket, self.object_name)
    }
}

/// Plain text extracted from one source document.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Source object location in `gs://bucket/object` form.
    pub source_path: String,
    /// Extracted text, newline-joined across logical segments.
    pub text: String,
}

/// Summary of a completed pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Resource key of the processed object.
    pub resource_key: String,
    /// Extraction strategy chosen for the document.
    pub strategy: ExtractionStrategy,
    /// Size of the extracted text in bytes.
    pub text_bytes: usize,
    /// Size of the generated summary in bytes.
    pub summary_bytes: usize,
}

/// Terminal disposition of one event delivery.
#[derive(Debug, Clone)]
pub enum EventOutcome {
    /// Pipeline ran to completion and a record was appended.
    Completed(PipelineOutcome),
    /// Failure cap reached; the resource was abandoned without a record.
    Dropped {
        /// Resource key of the abandoned object.
        resource_key: String,
        /// Failure count accumulated when the drop decision was made.
        attempts: u32,
    },
}

/// Errors raised while validating a storage event envelope.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required envelope field was absent or empty.
    #[error("Storage event is missing required field `{0}`")]
    MissingField(&'static str),
}

/// Errors raised while converting a stored document into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Source object could not be downloaded.
    #[error("Failed to download source object: {0}")]
    Download(#[source] StorageError),
    /// Scratch file could not be created or written.
    #[error("Failed to stage document in scratch space: {0}")]
    Scratch(#[from] std::io::Error),
    /// Document bytes could not be parsed into text.
    #[error("Failed to parse document text: {0}")]
    Parse(String),
    /// Recognition job submission or completion failed.
    #[error("Recognition job failed: {0}")]
    Recognition(#[from] DocAiError),
    /// Recognition output listing failed.
    #[error("Failed to list recognition output under {prefix}: {source}")]
    OutputListing {
        /// Output prefix that was being listed.
        prefix: String,
        /// Underlying storage error.
        #[source]
        source: StorageError,
    },
    /// Recognition job finished without writing any output files.
    #[error("Recognition job produced no output under {prefix}")]
    NoRecognitionOutput {
        /// Output prefix that came back empty.
        prefix: String,
    },
    /// Recognition output object could not be fetched.
    #[error("Failed to fetch recognition output {object}: {source}")]
    OutputFetch {
        /// Output object that failed to download.
        object: String,
        /// Underlying storage error.
        #[source]
        source: StorageError,
    },
    /// Recognition output was not a valid document description.
    #[error("Recognition output {object} could not be decoded: {source}")]
    OutputDecode {
        /// Output object that failed to decode.
        object: String,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors emitted by the document pipeline stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Extraction stage failed to produce text.
    #[error("Failed to extract document text: {0}")]
    Extraction(#[from] ExtractionError),
    /// Summarization stage failed to produce a summary.
    #[error("Failed to summarize document: {0}")]
    Summarize(#[from] SummarizeError),
    /// Persistence stage failed to append the record.
    #[error("Failed to persist output record: {0}")]
    Persist(#[from] PersistError),
}

/// Errors surfaced to the event intake surface.
#[derive(Debug, Error)]
pub enum EventError {
    /// Envelope failed validation before the pipeline ran.
    #[error("Invalid storage event: {0}")]
    Validation(#[from] ValidationError),
    /// A pipeline stage failed and the event remains eligible for redelivery.
    #[error("Processing failed: {0}")]
    Pipeline(#[from] PipelineError),
}
