//! HTTP client wrapper for the object storage JSON API.

use crate::config::get_config;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_STORAGE_BASE_URL: &str = "https://storage.googleapis.com";

/// Errors returned while interacting with object storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Storage responded with an unexpected status code.
    #[error("Unexpected storage response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from storage.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// Lightweight HTTP client for object download, listing, and deletion.
pub struct StorageClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) access_token: Option<String>,
}

impl StorageClient {
    /// Construct a new client using configuration derived from the environment.
    pub fn new() -> Result<Self, StorageError> {
        let config = get_config();
        let client = Client::builder().user_agent("docsummary/0.1").build()?;
        let base_url = config
            .storage_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_STORAGE_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        tracing::debug!(url = %base_url, "Initialized storage HTTP client");

        Ok(Self {
            client,
            base_url,
            access_token: config.access_token.clone(),
        })
    }

    /// Download the raw bytes of one object.
    pub async fn download(&self, bucket: &str, object: &str) -> Result<Vec<u8>, StorageError> {
        let url = format!(
            "{}/storage/v1/b/{bucket}/o/{}",
            self.base_url,
            encode_object_name(object)
        );
        let response = self
            .request(Method::GET, url)
            .query(&[("alt", "media")])
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.bytes().await?.to_vec())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StorageError::UnexpectedStatus { status, body };
            tracing::error!(bucket, object, error = %error, "Object download failed");
            Err(error)
        }
    }

    /// List the names of all objects under a prefix, following result pages.
    pub async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        let url = format!("{}/storage/v1/b/{bucket}/o", self.base_url);
        let mut page_token: Option<String> = None;
        let mut names = Vec::new();

        loop {
            let mut request = self
                .request(Method::GET, url.clone())
                .query(&[("prefix", prefix)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let response = request.send().await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let error = StorageError::UnexpectedStatus { status, body };
                tracing::error!(bucket, prefix, error = %error, "Object listing failed");
                return Err(error);
            }

            let page: ListObjectsResponse = response.json().await?;
            names.extend(page.items.into_iter().map(|item| item.name));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(names)
    }

    /// Delete one object.
    pub async fn delete(&self, bucket: &str, object: &str) -> Result<(), StorageError> {
        let url = format!(
            "{}/storage/v1/b/{bucket}/o/{}",
            self.base_url,
            encode_object_name(object)
        );
        let response = self.request(Method::DELETE, url).send().await?;

        self.ensure_success(response, || {
            tracing::debug!(bucket, object, "Object deleted");
        })
        .await
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

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), StorageError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StorageError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Storage request failed");
            Err(error)
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListObjectsResponse {
    #[serde(default)]
    items: Vec<ObjectSummary>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct ObjectSummary {
    name: String,
}

/// Percent-encode an object name for use as a single URL path segment.
///
/// Object names routinely contain `/`, which must arrive encoded for the JSON API to
/// treat the name as one segment.
fn encode_object_name(name: &str) -> String {
    let mut encoded = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char);
            }
            other => {
                encoded.push_str(&format!("%{other:02X}"));
            }
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::DELETE, Method::GET, MockServer};
    use serde_json::json;

    fn test_client(base_url: String) -> StorageClient {
        StorageClient {
            client: Client::builder()
                .user_agent("docsummary-test")
                .build()
                .expect("client"),
            base_url,
            access_token: None,
        }
    }

    #[test]
    fn encodes_object_names_as_single_segments() {
        assert_eq!(
            encode_object_name("ocr/job-1/output-1.json"),
            "ocr%2Fjob-1%2Foutput-1.json"
        );
        assert_eq!(encode_object_name("plain.pdf"), "plain.pdf");
        assert_eq!(encode_object_name("with space.txt"), "with%20space.txt");
    }

    #[tokio::test]
    async fn download_returns_object_bytes() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/storage/v1/b/inbox/o/docs%2Freport.pdf")
                    .query_param("alt", "media");
                then.status(200).body("raw bytes");
            })
            .await;

        let client = test_client(server.base_url());
        let bytes = client
            .download("inbox", "docs/report.pdf")
            .await
            .expect("download");

        mock.assert();
        assert_eq!(bytes, b"raw bytes");
    }

    #[tokio::test]
    async fn download_surfaces_unexpected_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/storage/v1/b/inbox/o/missing.pdf");
                then.status(404).body("object not found");
            })
            .await;

        let client = test_client(server.base_url());
        let error = client
            .download("inbox", "missing.pdf")
            .await
            .expect_err("missing object");

        match error {
            StorageError::UnexpectedStatus { status, body } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert!(body.contains("not found"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn list_collects_item_names() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/storage/v1/b/out/o")
                    .query_param("prefix", "ocr/job-1/");
                then.status(200).json_body(json!({
                    "items": [
                        { "name": "ocr/job-1/output-2.json" },
                        { "name": "ocr/job-1/output-1.json" }
                    ]
                }));
            })
            .await;

        let client = test_client(server.base_url());
        let names = client.list("out", "ocr/job-1/").await.expect("listing");

        mock.assert();
        assert_eq!(
            names,
            vec!["ocr/job-1/output-2.json", "ocr/job-1/output-1.json"]
        );
    }

    #[tokio::test]
    async fn delete_accepts_no_content() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/storage/v1/b/out/o/stale.json");
                then.status(204);
            })
            .await;

        let client = test_client(server.base_url());
        client.delete("out", "stale.json").await.expect("delete");
        mock.assert();
    }
}
