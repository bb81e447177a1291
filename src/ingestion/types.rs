//! Data shapes and error definitions for the ingestion workflow and query surface.

use crate::extraction::ExtractionError;
use crate::store::StoreError;
use crate::summarization::SummarizationClientError;
use axum::body::Bytes;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// One file received in an upload batch.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Filename as supplied by the client.
    pub name: String,
    /// Raw file contents.
    pub bytes: Bytes,
}

/// Why a file was skipped rather than processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Extension is not on the allow-list.
    UnsupportedFormat,
    /// A row (or an earlier file in the same batch) already owns the storage path.
    AlreadyExists,
    /// Filename cannot be used as a storage path segment.
    InvalidFilename(&'static str),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedFormat => f.write_str("Unsupported format."),
            Self::AlreadyExists => f.write_str("File already exists."),
            Self::InvalidFilename(message) => f.write_str(message),
        }
    }
}

/// Status-specific fields of a per-file outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// File stored, summarized and recorded.
    Processed {
        /// Identifier assigned by the store.
        id: i32,
        /// Storage path.
        path: String,
        /// Lowercase extension without the leading dot.
        format: String,
        /// Stored size in bytes.
        size: i64,
        /// Generated summary.
        summary: String,
    },
    /// File rejected before any processing.
    Skipped {
        /// Human-readable reason.
        reason: String,
    },
    /// Processing failed.
    Error {
        /// Stringified cause.
        reason: String,
    },
}

/// Result of ingesting one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    /// Filename as supplied by the client.
    pub name: String,
    /// Outcome bucket plus its fields.
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl FileOutcome {
    pub(crate) fn skipped(name: impl Into<String>, reason: SkipReason) -> Self {
        Self {
            name: name.into(),
            status: OutcomeStatus::Skipped {
                reason: reason.to_string(),
            },
        }
    }

    pub(crate) fn error(name: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            name: name.into(),
            status: OutcomeStatus::Error {
                reason: reason.to_string(),
            },
        }
    }

    /// Whether the file ended in the `processed` bucket.
    pub fn is_processed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Processed { .. })
    }
}

/// Outcomes of one batch partitioned by status, each bucket in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Files stored and summarized.
    pub processed: Vec<FileOutcome>,
    /// Files skipped as unsupported, invalid, or duplicate.
    pub skipped: Vec<FileOutcome>,
    /// Files whose processing failed.
    pub errored: Vec<FileOutcome>,
}

impl BatchReport {
    /// Partition outcomes into buckets, preserving their relative order.
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = FileOutcome>) -> Self {
        let mut report = Self::default();
        for outcome in outcomes {
            match outcome.status {
                OutcomeStatus::Processed { .. } => report.processed.push(outcome),
                OutcomeStatus::Skipped { .. } => report.skipped.push(outcome),
                OutcomeStatus::Error { .. } => report.errored.push(outcome),
            }
        }
        report
    }
}

/// Listing entry returned by the query surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileListing {
    /// Row identifier.
    pub id: i32,
    /// Original filename.
    pub name: String,
    /// Lowercase extension without the leading dot.
    pub format: String,
    /// Storage path.
    pub path: String,
}

/// Summary of a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    /// Row identifier.
    pub id: i32,
    /// Stored summary.
    pub summary: Option<String>,
}

/// Freshly extracted content of a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileContent {
    /// Row identifier.
    pub id: i32,
    /// Extracted text.
    pub content: String,
}

/// Failures inside one file's pipeline, reported as that file's `error` outcome.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Writing, renaming, or inspecting the stored file failed.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Text extraction failed.
    #[error("{0}")]
    Extraction(#[from] ExtractionError),
    /// The summarization provider failed.
    #[error("{0}")]
    Summarization(#[from] SummarizationClientError),
    /// The metadata store failed.
    #[error("{0}")]
    Store(#[from] StoreError),
    /// The pipeline task itself panicked or was aborted.
    #[error("Processing task failed: {0}")]
    Task(String),
}

/// Batch-level failures of the ingestion workflow.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Every file of the batch was skipped or errored.
    #[error("No valid or new files were processed.")]
    NothingProcessed(BatchReport),
}

/// Failures of the read-only query surface.
#[derive(Debug, Error)]
pub enum QueryError {
    /// No row has this identifier.
    #[error("File not found.")]
    NotFound(i32),
    /// The row exists but its stored file is missing.
    #[error("File with ID {0} not found or its content can't be extracted.")]
    ContentUnavailable(i32),
    /// Extraction of an existing file failed.
    #[error("Failed to extract file content: {0}")]
    Extraction(ExtractionError),
    /// The metadata store failed.
    #[error("{0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn processed(name: &str) -> FileOutcome {
        FileOutcome {
            name: name.into(),
            status: OutcomeStatus::Processed {
                id: 1,
                path: format!("uploaded_files/{name}"),
                format: "txt".into(),
                size: 4,
                summary: "short".into(),
            },
        }
    }

    #[test]
    fn report_partitions_preserving_order() {
        let report = BatchReport::from_outcomes(vec![
            FileOutcome::skipped("a.png", SkipReason::UnsupportedFormat),
            processed("b.txt"),
            FileOutcome::error("c.pdf", "boom"),
            processed("d.txt"),
            FileOutcome::skipped("b.txt", SkipReason::AlreadyExists),
        ]);

        let names = |bucket: &[FileOutcome]| {
            bucket
                .iter()
                .map(|outcome| outcome.name.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&report.processed), vec!["b.txt", "d.txt"]);
        assert_eq!(names(&report.skipped), vec!["a.png", "b.txt"]);
        assert_eq!(names(&report.errored), vec!["c.pdf"]);
    }

    #[test]
    fn outcomes_serialize_flat_with_status_tag() {
        assert_eq!(
            serde_json::to_value(processed("b.txt")).expect("json"),
            json!({
                "name": "b.txt",
                "status": "processed",
                "id": 1,
                "path": "uploaded_files/b.txt",
                "format": "txt",
                "size": 4,
                "summary": "short"
            })
        );
        assert_eq!(
            serde_json::to_value(FileOutcome::skipped("x.exe", SkipReason::UnsupportedFormat))
                .expect("json"),
            json!({ "name": "x.exe", "status": "skipped", "reason": "Unsupported format." })
        );
        assert_eq!(
            serde_json::to_value(FileOutcome::error("y.pdf", "corrupt")).expect("json"),
            json!({ "name": "y.pdf", "status": "error", "reason": "corrupt" })
        );
    }
}
