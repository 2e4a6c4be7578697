use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_DOCAI_LOCATION: &str = "us";
const DEFAULT_SUMMARY_MODEL: &str = "gemini-pro";
const DEFAULT_VERTEX_LOCATION: &str = "europe-central2";
const DEFAULT_OCR_FETCH_CONCURRENCY: usize = 15;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the document ingestion service.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Cloud project that owns the recognition processor and warehouse dataset.
    pub project_id: String,
    /// Full resource name of the batch recognition processor.
    pub docai_processor: String,
    /// Region of the recognition service endpoint.
    pub docai_location: String,
    /// Bucket receiving recognition job output files.
    pub output_bucket: String,
    /// Warehouse dataset holding the results table.
    pub warehouse_dataset: String,
    /// Warehouse table receiving one row per processed document.
    pub warehouse_table: String,
    /// Generative model used to produce summaries.
    pub summary_model: String,
    /// Region of the generative model endpoint.
    pub vertex_location: String,
    /// Optional bearer token attached to every downstream request.
    pub access_token: Option<String>,
    /// Optional override for the object storage endpoint.
    pub storage_base_url: Option<String>,
    /// Optional override for the recognition service endpoint.
    pub docai_base_url: Option<String>,
    /// Optional override for the generative model endpoint.
    pub vertex_base_url: Option<String>,
    /// Optional override for the warehouse endpoint.
    pub warehouse_base_url: Option<String>,
    /// Maximum number of recognition output files fetched concurrently.
    pub ocr_fetch_concurrency: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            project_id: load_env("GCLOUD_PROJECT")?,
            docai_processor: load_env("DOCAI_PROCESSOR")?,
            docai_location: load_env_optional("DOCAI_LOCATION")
                .unwrap_or_else(|| DEFAULT_DOCAI_LOCATION.to_string()),
            output_bucket: load_env("OUTPUT_BUCKET")?,
            warehouse_dataset: load_env("BQ_DATASET")?,
            warehouse_table: load_env("BQ_TABLE")?,
            summary_model: load_env_optional("SUMMARY_MODEL")
                .unwrap_or_else(|| DEFAULT_SUMMARY_MODEL.to_string()),
            vertex_location: load_env_optional("VERTEX_LOCATION")
                .unwrap_or_else(|| DEFAULT_VERTEX_LOCATION.to_string()),
            access_token: load_env_optional("GCLOUD_ACCESS_TOKEN"),
            storage_base_url: load_env_optional("STORAGE_BASE_URL"),
            docai_base_url: load_env_optional("DOCAI_BASE_URL"),
            vertex_base_url: load_env_optional("VERTEX_BASE_URL"),
            warehouse_base_url: load_env_optional("BIGQUERY_BASE_URL"),
            ocr_fetch_concurrency: load_env_optional("OCR_FETCH_CONCURRENCY")
                .map(|value| {
                    value
                        .parse::<usize>()
                        .ok()
                        .filter(|parsed| *parsed > 0)
                        .ok_or_else(|| ConfigError::InvalidValue("OCR_FETCH_CONCURRENCY".into()))
                })
                .transpose()?
                .unwrap_or(DEFAULT_OCR_FETCH_CONCURRENCY),
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        project = %config.project_id,
        processor = %config.docai_processor,
        output_bucket = %config.output_bucket,
        dataset = %config.warehouse_dataset,
        table = %config.warehouse_table,
        model = %config.summary_model,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
