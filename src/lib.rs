#![deny(missing_docs)]

//! Core library for the document ingestion and summarization service.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Batch document recognition client and output document model.
pub mod docai;
/// Generative model client used for summarization.
pub mod genai;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// Event-driven document pipeline.
pub mod pipeline;
/// Object storage client.
pub mod storage;
/// Warehouse table persistence.
pub mod warehouse;
