#![deny(missing_docs)]

//! Core library for the document summary service.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Plain-text extraction from stored documents.
pub mod extraction;
/// Upload ingestion workflow and metadata queries.
pub mod ingestion;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// Relational metadata store.
pub mod store;
/// Language-model summarization clients.
pub mod summarization;
