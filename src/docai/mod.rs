//! Batch document-recognition client.
//!
//! Scanned documents are converted to text by an asynchronous recognition job: the job is
//! submitted against a configured processor, tracked as a long-running operation, and its
//! structured output files land under a storage prefix chosen by the caller.

pub mod types;

pub use types::{DocumentPage, Paragraph, RecognizedDocument, TextIndex, TextSegment};

use crate::config::get_config;
use crate::docai::types::{OperationHandle, OperationStatus};
use reqwest::{Client, Method, StatusCode};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

const OPERATION_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Errors returned while running batch recognition jobs.
#[derive(Debug, Error)]
pub enum DocAiError {
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Recognition service responded with an unexpected status code.
    #[error("Unexpected recognition response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from the recognition service.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Recognition operation completed with an error payload.
    #[error("Recognition operation failed (code {code}): {message}")]
    OperationFailed {
        /// Status code reported by the operation.
        code: i64,
        /// Human-readable failure message reported by the operation.
        message: String,
    },
}

/// Lightweight HTTP client for the batch recognition service.
pub struct DocAiClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) processor: String,
    pub(crate) access_token: Option<String>,
}

impl DocAiClient {
    /// Construct a new client using configuration derived from the environment.
    pub fn new() -> Result<Self, DocAiError> {
        let config = get_config();
        let client = Client::builder().user_agent("docsummary/0.1").build()?;
        let base_url = config
            .docai_base_url
            .clone()
            .unwrap_or_else(|| {
                format!("https://{}-documentai.googleapis.com", config.docai_location)
            })
            .trim_end_matches('/')
            .to_string();
        tracing::debug!(url = %base_url, processor = %config.docai_processor, "Initialized recognition HTTP client");

        Ok(Self {
            client,
            base_url,
            processor: config.docai_processor.clone(),
            access_token: config.access_token.clone(),
        })
    }

    /// Submit a recognition job for one source document and wait for it to complete.
    ///
    /// Output files are written under `output_uri_prefix`; collecting them afterwards is
    /// the caller's responsibility.
    pub async fn batch_recognize(
        &self,
        source_uri: &str,
        mime_type: &str,
        output_uri_prefix: &str,
    ) -> Result<(), DocAiError> {
        let body = json!({
            "inputDocuments": {
                "gcsDocuments": {
                    "documents": [
                        { "gcsUri": source_uri, "mimeType": mime_type }
                    ]
                }
            },
            "documentOutputConfig": {
                "gcsOutputConfig": { "gcsUri": output_uri_prefix }
            }
        });

        let url = format!("{}/v1/{}:batchProcess", self.base_url, self.processor);
        let response = self.request(Method::POST, url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = DocAiError::UnexpectedStatus { status, body };
            tracing::error!(source = source_uri, error = %error, "Recognition job submission failed");
            return Err(error);
        }

        let handle: OperationHandle = response.json().await?;
        tracing::debug!(operation = %handle.name, source = source_uri, "Recognition job submitted");
        self.wait_for_operation(&handle.name).await
    }

    /// Poll a long-running operation until it reports completion.
    async fn wait_for_operation(&self, operation_name: &str) -> Result<(), DocAiError> {
        loop {
            let url = format!("{}/v1/{operation_name}", self.base_url);
            let response = self.request(Method::GET, url).send().await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let error = DocAiError::UnexpectedStatus { status, body };
                tracing::error!(operation = operation_name, error = %error, "Operation poll failed");
                return Err(error);
            }

            let status: OperationStatus = response.json().await?;
            if status.done {
                return match status.error {
                    Some(failure) => {
                        let error = DocAiError::OperationFailed {
                            code: failure.code,
                            message: failure.message,
                        };
                        tracing::error!(operation = operation_name, error = %error, "Recognition operation failed");
                        Err(error)
                    }
                    None => {
                        tracing::debug!(operation = operation_name, "Recognition operation complete");
                        Ok(())
                    }
                };
            }

            tokio::time::sleep(OPERATION_POLL_INTERVAL).await;
        }
    }

    fn request(&self, method: Method, url: String) -> reqwest::RequestBuilder {
        let mut req = self.client.request(method, url);
        if let Some(token) = &self.access_token
            && !token.is_empty()
        {
            req = req.bearer_auth(token);
        }
        req
    }
}
