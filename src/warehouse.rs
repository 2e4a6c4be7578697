//! Analytical warehouse writer.
//!
//! Each successfully processed document is appended as one row to a configured table.
//! Writes are append-only: no upsert, no idempotency key, and no transactional coupling
//! with the extraction or summarization stages.

use crate::config::get_config;
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const DEFAULT_WAREHOUSE_BASE_URL: &str = "https://bigquery.googleapis.com";

/// Errors returned while appending rows to the warehouse.
#[derive(Debug, Error)]
pub enum PersistError {
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Warehouse responded with an unexpected status code.
    #[error("Unexpected warehouse response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from the warehouse.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Warehouse accepted the request but rejected rows inside it.
    #[error("Warehouse rejected {count} row(s): {detail}")]
    RowsRejected {
        /// Number of rejected rows.
        count: usize,
        /// Reason reported for the first rejected row.
        detail: String,
    },
}

/// One row appended to the results table per successful pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct OutputRecord {
    /// Identifier of the storage event that triggered processing.
    pub event_id: String,
    /// Upload timestamp of the source object, RFC3339.
    pub time_uploaded: String,
    /// Timestamp at which processing finished, RFC3339.
    pub time_processed: String,
    /// Source object path in `gs://bucket/object` form.
    pub document_path: String,
    /// Full extracted document text.
    pub document_text: String,
    /// Generated summary of the document.
    pub document_summary: String,
}

impl OutputRecord {
    /// Assemble a record, stamping the processing time.
    ///
    /// A missing upload timestamp falls back to the processing time, and a processing
    /// clock behind the upload timestamp is raised to it, so `time_processed` never
    /// precedes `time_uploaded`.
    pub fn new(
        event_id: String,
        time_uploaded: Option<OffsetDateTime>,
        document_path: String,
        document_text: String,
        document_summary: String,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        let uploaded = time_uploaded.unwrap_or(now);
        let processed = if now < uploaded { uploaded } else { now };

        Self {
            event_id,
            time_uploaded: format_rfc3339(uploaded),
            time_processed: format_rfc3339(processed),
            document_path,
            document_text,
            document_summary,
        }
    }
}

fn format_rfc3339(timestamp: OffsetDateTime) -> String {
    timestamp.format(&Rfc3339).unwrap_or_default()
}

/// Lightweight HTTP client appending rows to the warehouse table.
pub struct WarehouseClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) project_id: String,
    pub(crate) dataset: String,
    pub(crate) table: String,
    pub(crate) access_token: Option<String>,
}

impl WarehouseClient {
    /// Construct a new client using configuration derived from the environment.
    pub fn new() -> Result<Self, PersistError> {
        let config = get_config();
        let client = Client::builder().user_agent("docsummary/0.1").build()?;
        let base_url = config
            .warehouse_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_WAREHOUSE_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        tracing::debug!(
            url = %base_url,
            dataset = %config.warehouse_dataset,
            table = %config.warehouse_table,
            "Initialized warehouse HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            project_id: config.project_id.clone(),
            dataset: config.warehouse_dataset.clone(),
            table: config.warehouse_table.clone(),
            access_token: config.access_token.clone(),
        })
    }

    /// Append one record to the results table.
    pub async fn insert_row(&self, record: &OutputRecord) -> Result<(), PersistError> {
        let url = format!(
            "{}/bigquery/v2/projects/{}/datasets/{}/tables/{}/insertAll",
            self.base_url, self.project_id, self.dataset, self.table
        );
        let body = json!({ "rows": [{ "json": record }] });

        let response = self.request(Method::POST, url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = PersistError::UnexpectedStatus { status, body };
            tracing::error!(path = %record.document_path, error = %error, "Warehouse insert failed");
            return Err(error);
        }

        // Row-level failures arrive inside a 2xx body and must not pass silently.
        let payload: InsertAllResponse = response.json().await?;
        if !payload.insert_errors.is_empty() {
            let detail = payload
                .insert_errors
                .first()
                .and_then(|row| row.errors.first())
                .map(|proto| format!("{}: {}", proto.reason, proto.message))
                .unwrap_or_else(|| "unknown".to_string());
            let error = PersistError::RowsRejected {
                count: payload.insert_errors.len(),
                detail,
            };
            tracing::error!(path = %record.document_path, error = %error, "Warehouse rejected rows");
            return Err(error);
        }

        tracing::debug!(path = %record.document_path, "Record appended");
        Ok(())
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
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<RowError>,
}

#[derive(Deserialize)]
struct RowError {
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use time::Duration;

    fn test_client(base_url: String) -> WarehouseClient {
        WarehouseClient {
            client: Client::builder()
                .user_agent("docsummary-test")
                .build()
                .expect("client"),
            base_url,
            project_id: "demo".into(),
            dataset: "docs".into(),
            table: "summaries".into(),
            access_token: None,
        }
    }

    fn sample_record() -> OutputRecord {
        OutputRecord {
            event_id: "evt-1".into(),
            time_uploaded: "2024-04-02T08:00:00Z".into(),
            time_processed: "2024-04-02T08:00:05Z".into(),
            document_path: "gs://bucket/report.pdf".into(),
            document_text: "Full text".into(),
            document_summary: "Summary X".into(),
        }
    }

    #[tokio::test]
    async fn insert_row_sends_expected_payload() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/bigquery/v2/projects/demo/datasets/docs/tables/summaries/insertAll")
                    .json_body(serde_json::json!({
                        "rows": [{
                            "json": {
                                "event_id": "evt-1",
                                "time_uploaded": "2024-04-02T08:00:00Z",
                                "time_processed": "2024-04-02T08:00:05Z",
                                "document_path": "gs://bucket/report.pdf",
                                "document_text": "Full text",
                                "document_summary": "Summary X"
                            }
                        }]
                    }));
                then.status(200).json_body(serde_json::json!({
                    "kind": "bigquery#tableDataInsertAllResponse"
                }));
            })
            .await;

        let client = test_client(server.base_url());
        client
            .insert_row(&sample_record())
            .await
            .expect("insert row");
        mock.assert();
    }

    #[tokio::test]
    async fn insert_row_rejects_row_level_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path_contains("/insertAll");
                then.status(200).json_body(serde_json::json!({
                    "insertErrors": [{
                        "index": 0,
                        "errors": [{ "reason": "invalid", "message": "bad timestamp" }]
                    }]
                }));
            })
            .await;

        let client = test_client(server.base_url());
        let error = client
            .insert_row(&sample_record())
            .await
            .expect_err("rejected row");

        match error {
            PersistError::RowsRejected { count, detail } => {
                assert_eq!(count, 1);
                assert!(detail.contains("bad timestamp"));
            }
            other => panic!("expected row rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn insert_row_surfaces_unexpected_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path_contains("/insertAll");
                then.status(401).body("missing credentials");
            })
            .await;

        let client = test_client(server.base_url());
        let error = client
            .insert_row(&sample_record())
            .await
            .expect_err("auth failure");

        match error {
            PersistError::UnexpectedStatus { status, .. } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn record_processing_time_never_precedes_upload_time() {
        let future = OffsetDateTime::now_utc() + Duration::hours(1);
        let record = OutputRecord::new(
            "evt-2".into(),
            Some(future),
            "gs://bucket/late.pdf".into(),
            String::new(),
            String::new(),
        );
        assert_eq!(record.time_processed, record.time_uploaded);

        let past = OffsetDateTime::now_utc() - Duration::hours(1);
        let record = OutputRecord::new(
            "evt-3".into(),
            Some(past),
            "gs://bucket/old.pdf".into(),
            String::new(),
            String::new(),
        );
        let uploaded =
            OffsetDateTime::parse(&record.time_uploaded, &Rfc3339).expect("uploaded timestamp");
        let processed =
            OffsetDateTime::parse(&record.time_processed, &Rfc3339).expect("processed timestamp");
        assert!(processed >= uploaded);
    }

    #[test]
    fn record_without_upload_time_uses_processing_time() {
        let record = OutputRecord::new(
            "evt-4".into(),
            None,
            "gs://bucket/unknown.pdf".into(),
            String::new(),
            String::new(),
        );
        assert_eq!(record.time_uploaded, record.time_processed);
        assert!(!record.time_processed.is_empty());
    }
}
