//! Text extraction strategies for stored documents.
//!
//! Text-native documents are downloaded and parsed locally; scanned documents go through
//! an asynchronous batch recognition job whose output files are fetched with bounded
//! concurrency and reassembled in listing order.

use crate::docai::{DocAiClient, RecognizedDocument};
use crate::pipeline::types::{ExtractedDocument, ExtractionError, IngestionEvent};
use crate::storage::StorageClient;
use futures_util::future::join_all;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::sync::Semaphore;
use uuid::Uuid;

const DEFAULT_OCR_MIME_TYPE: &str = "application/pdf";

/// Extraction strategy chosen for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Download the object and parse its bytes locally.
    DirectParse,
    /// Run a batch recognition job and assemble its output files.
    BatchOcr,
}

impl ExtractionStrategy {
    /// Decide the strategy for a document from its recorded MIME type.
    ///
    /// Text-native types (PDF and `text/*`) parse locally; everything else, including
    /// documents with no recorded type, goes through recognition.
    pub fn for_content_type(content_type: Option<&str>) -> Self {
        let essence = content_type_essence(content_type);
        if essence == "application/pdf" || essence.starts_with("text/") {
            Self::DirectParse
        } else {
            Self::BatchOcr
        }
    }

    /// Stable lowercase label used in logs and responses.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DirectParse => "direct_parse",
            Self::BatchOcr => "batch_ocr",
        }
    }
}

/// MIME type stripped of parameters and normalized to lowercase.
fn content_type_essence(content_type: Option<&str>) -> String {
    content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Converts one stored document into plain text.
pub struct TextExtractor {
    storage: StorageClient,
    recognizer: DocAiClient,
    output_bucket: String,
    fetch_concurrency: usize,
}

impl TextExtractor {
    /// Build an extractor over the given storage and recognition clients.
    pub fn new(
        storage: StorageClient,
        recognizer: DocAiClient,
        output_bucket: String,
        fetch_concurrency: usize,
    ) -> Self {
        Self {
            storage,
            recognizer,
            output_bucket,
            fetch_concurrency,
        }
    }

    /// Extract the document named by an event using the chosen strategy.
    pub async fn extract(
        &self,
        event: &IngestionEvent,
        strategy: ExtractionStrategy,
    ) -> Result<ExtractedDocument, ExtractionError> {
        tracing::debug!(
            resource = %event.resource_key(),
            strategy = strategy.as_str(),
            "Extracting document text"
        );
        let text = match strategy {
            ExtractionStrategy::DirectParse => self.direct_parse(event).await?,
            ExtractionStrategy::BatchOcr => self.batch_ocr(event).await?,
        };

        Ok(ExtractedDocument {
            source_path: event.source_uri(),
            text,
        })
    }

    /// Download the object and parse its bytes locally.
    ///
    /// PDF bytes are staged in a scratch file for the parser; the file is unlinked when
    /// `scratch` drops, on the error paths included.
    async fn direct_parse(&self, event: &IngestionEvent) -> Result<String, ExtractionError> {
        let bytes = self
            .storage
            .download(&event.bucket, &event.object_name)
            .await
            .map_err(ExtractionError::Download)?;

        if content_type_essence(event.content_type.as_deref()).starts_with("text/") {
            return String::from_utf8(bytes).map_err(|err| ExtractionError::Parse(err.to_string()));
        }

        let mut scratch = NamedTempFile::new()?;
        scratch.write_all(&bytes)?;
        scratch.flush()?;
        tracing::debug!(
            resource = %event.resource_key(),
            bytes = bytes.len(),
            scratch = %scratch.path().display(),
            "Staged document for parsing"
        );

        let path = scratch.path().to_path_buf();
        let parsed = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text(&path).map_err(|err| err.to_string())
        })
        .await
        .map_err(|err| ExtractionError::Parse(err.to_string()))?;

        parsed.map_err(ExtractionError::Parse)
    }

    /// Run a recognition job and assemble its output files into one text.
    ///
    /// Output files are fetched concurrently under a semaphore, but `join_all` yields
    /// results in submission order, so the assembled text follows the sorted listing
    /// regardless of which fetches finish first.
    async fn batch_ocr(&self, event: &IngestionEvent) -> Result<String, ExtractionError> {
        let output_prefix = format!("ocr/{}/", Uuid::new_v4());
        let destination = format!("gs://{}/{}", self.output_bucket, output_prefix);
        let mime_type = event
            .content_type
            .clone()
            .unwrap_or_else(|| DEFAULT_OCR_MIME_TYPE.to_string());

        tracing::info!(
            resource = %event.resource_key(),
            destination = %destination,
            mime_type = %mime_type,
            "Submitting recognition job"
        );
        self.recognizer
            .batch_recognize(&event.source_uri(), &mime_type, &destination)
            .await?;

        let mut outputs = self
            .storage
            .list(&self.output_bucket, &output_prefix)
            .await
            .map_err(|source| ExtractionError::OutputListing {
                prefix: output_prefix.clone(),
                source,
            })?;
        if outputs.is_empty() {
            return Err(ExtractionError::NoRecognitionOutput {
                prefix: output_prefix,
            });
        }
        outputs.sort();
        tracing::debug!(
            resource = %event.resource_key(),
            outputs = outputs.len(),
            "Recognition job wrote output files"
        );

        let limiter = Arc::new(Semaphore::new(self.fetch_concurrency));
        let fetches = outputs.iter().map(|object| {
            let limiter = Arc::clone(&limiter);
            async move {
                let _permit = limiter
                    .acquire()
                    .await
                    .expect("output fetch semaphore closed");
                self.fetch_output_paragraphs(object).await
            }
        });
        let results = join_all(fetches).await;

        let mut paragraphs: Vec<String> = Vec::new();
        let mut failure = None;
        for result in results {
            match result {
                Ok(texts) => paragraphs.extend(texts),
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        // Job outputs are working files; remove them even when assembly failed.
        for object in &outputs {
            if let Err(err) = self.storage.delete(&self.output_bucket, object).await {
                tracing::warn!(object = %object, error = %err, "Failed to remove recognition output");
            }
        }

        if let Some(err) = failure {
            return Err(err);
        }
        Ok(paragraphs.join("\n"))
    }

    /// Fetch one recognition output file and resolve its paragraph texts.
    async fn fetch_output_paragraphs(&self, object: &str) -> Result<Vec<String>, ExtractionError> {
        let bytes = self
            .storage
            .download(&self.output_bucket, object)
            .await
            .map_err(|source| ExtractionError::OutputFetch {
                object: object.to_string(),
                source,
            })?;
        let document: RecognizedDocument =
            serde_json::from_slice(&bytes).map_err(|source| ExtractionError::OutputDecode {
                object: object.to_string(),
                source,
            })?;

        Ok(document
            .paragraph_texts()
            .into_iter()
            .map(str::to_string)
            .collect())
    }
}
