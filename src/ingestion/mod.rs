//! Document ingestion workflow: validation, storage, extraction, summarization, and metadata.

pub mod sanitize;
mod service;
pub mod types;

pub use service::{IngestionApi, IngestionService, SUMMARY_INPUT_CHARS};
pub use types::{
    BatchError, BatchReport, FileContent, FileListing, FileOutcome, FileSummary, IngestionError,
    OutcomeStatus, QueryError, SkipReason, UploadedFile,
};
