//! HTTP surface for the document ingestion service.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /events` – Accept one storage notification, run the extraction,
//!   summarization, and persistence pipeline for it, and report the outcome
//!   (`completed` or `dropped`). Pipeline failures below the failure cap return a
//!   server error so the delivery platform redelivers the event.
//! - `GET /metrics` – Observe ingestion counters and the sizes of the last
//!   processed document and summary.
//! - `GET /healthz` – Liveness probe.
//!
//! The response status encodes the retry contract: only a non-2xx status makes the
//! delivery platform try again.

use crate::metrics::MetricsSnapshot;
use crate::pipeline::{EventEnvelope, EventError, EventOutcome, PipelineApi};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;

/// Build the HTTP router exposing the event intake surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: PipelineApi + 'static,
{
    Router::new()
        .route("/events", post(ingest_event::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/healthz", get(health))
        .with_state(service)
}

/// Success response for the `POST /events` endpoint.
#[derive(Serialize)]
struct EventResponse {
    /// `completed` when a record was appended, `dropped` when the failure cap
    /// abandoned the resource.
    status: &'static str,
    /// `bucket/object` key of the resource the event named.
    resource_key: String,
    /// Extraction strategy used, present on completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    strategy: Option<&'static str>,
    /// Extracted text size in bytes, present on completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    text_bytes: Option<usize>,
    /// Summary size in bytes, present on completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    summary_bytes: Option<usize>,
    /// Failure count that triggered the drop, present on drops.
    #[serde(skip_serializing_if = "Option::is_none")]
    attempts: Option<u32>,
}

/// Run the pipeline for one storage notification.
///
/// A drop is reported with a success status on purpose: the resource has been
/// abandoned and a redelivery would only repeat the failures.
async fn ingest_event<S>(
    State(service): State<Arc<S>>,
    Json(envelope): Json<EventEnvelope>,
) -> Result<Json<EventResponse>, AppError>
where
    S: PipelineApi,
{
    let outcome = service.handle_event(envelope).await?;
    let response = match outcome {
        EventOutcome::Completed(run) => EventResponse {
            status: "completed",
            resource_key: run.resource_key,
            strategy: Some(run.strategy.as_str()),
            text_bytes: Some(run.text_bytes),
            summary_bytes: Some(run.summary_bytes),
            attempts: None,
        },
        EventOutcome::Dropped {
            resource_key,
            attempts,
        } => EventResponse {
            status: "dropped",
            resource_key,
            strategy: None,
            text_bytes: None,
            summary_bytes: None,
            attempts: Some(attempts),
        },
    };
    Ok(Json(response))
}

/// Response body for `GET /metrics`.
#[derive(Serialize)]
struct MetricsResponse {
    events_received: u64,
    documents_processed: u64,
    failures_recorded: u64,
    documents_dropped: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_document_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_summary_bytes: Option<u64>,
}

/// Return a concise metrics snapshot with ingestion counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsResponse>
where
    S: PipelineApi,
{
    let MetricsSnapshot {
        events_received,
        documents_processed,
        failures_recorded,
        documents_dropped,
        last_document_bytes,
        last_summary_bytes,
    } = service.metrics_snapshot();
    Json(MetricsResponse {
        events_received,
        documents_processed,
        failures_recorded,
        documents_dropped,
        last_document_bytes,
        last_summary_bytes,
    })
}

/// Response body for `GET /healthz`.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Liveness probe.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

struct AppError(EventError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EventError::Validation(_) => StatusCode::BAD_REQUEST,
            EventError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string()).into_response()
    }
}

impl From<EventError> for AppError {
    fn from(inner: EventError) -> Self {
        Self(inner)
    }
}
