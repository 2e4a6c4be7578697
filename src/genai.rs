//! Generative model client used to summarize extracted document text.
//!
//! The summarizer substitutes the document text into a fixed prompt and requests a single
//! completion. An answer without candidates or content parts is treated as a hard failure
//! rather than an empty summary, since it usually signals model or quota malfunction.

use crate::config::get_config;
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

const SUMMARIZATION_PROMPT: &str = "You are an expert in summarizing technical documentation related to the logistics of dangerous goods in rail and road transport. Your task is to provide a concise and accurate summary of the following TEXT. Use same language and style as the original document.\n\n\nTEXT:\n{text}\n";

/// Errors surfaced while requesting a summary from the generative model.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Model service responded with an unexpected status code.
    #[error("Unexpected model response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from the model service.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Model answered without any usable summary text.
    #[error("Model response contained no usable summary: {0}")]
    EmptyResponse(&'static str),
}

/// Summary produced for one document.
#[derive(Debug, Clone)]
pub struct SummaryResult {
    /// Model that produced the summary.
    pub model_name: String,
    /// Summary text extracted from the first candidate.
    pub summary_text: String,
}

/// Interface implemented by summary model backends.
#[async_trait]
pub trait SummaryModel: Send + Sync {
    /// Produce a short summary of the supplied document text.
    async fn summarize(&self, text: &str) -> Result<SummaryResult, SummarizeError>;
}

/// HTTP client for the hosted generative model endpoint.
pub struct GenAiClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) project_id: String,
    pub(crate) location: String,
    pub(crate) model: String,
    pub(crate) access_token: Option<String>,
}

impl GenAiClient {
    /// Construct a new client using configuration derived from the environment.
    pub fn new() -> Result<Self, SummarizeError> {
        let config = get_config();
        let client = Client::builder().user_agent("docsummary/0.1").build()?;
        let base_url = config
            .vertex_base_url
            .clone()
            .unwrap_or_else(|| {
                format!("https://{}-aiplatform.googleapis.com", config.vertex_location)
            })
            .trim_end_matches('/')
            .to_string();
        tracing::debug!(url = %base_url, model = %config.summary_model, "Initialized model HTTP client");

        Ok(Self {
            client,
            base_url,
            project_id: config.project_id.clone(),
            location: config.vertex_location.clone(),
            model: config.summary_model.clone(),
            access_token: config.access_token.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            self.base_url, self.project_id, self.location, self.model
        )
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

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl SummaryModel for GenAiClient {
    async fn summarize(&self, text: &str) -> Result<SummaryResult, SummarizeError> {
        let prompt = SUMMARIZATION_PROMPT.replace("{text}", text);
        let body = json!({
            "contents": [
                { "role": "user", "parts": [{ "text": prompt }] }
            ]
        });

        let response = self
            .request(Method::POST, self.endpoint())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = SummarizeError::UnexpectedStatus { status, body };
            tracing::error!(model = %self.model, error = %error, "Summary request failed");
            return Err(error);
        }

        let payload: GenerateContentResponse = response.json().await?;
        let candidate = payload
            .candidates
            .into_iter()
            .next()
            .ok_or(SummarizeError::EmptyResponse("no candidates returned"))?;
        let part = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or(SummarizeError::EmptyResponse(
                "candidate contained no content parts",
            ))?;

        Ok(SummaryResult {
            model_name: self.model.clone(),
            summary_text: part.text,
        })
    }
}
