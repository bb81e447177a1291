//! Ingestion service coordinating storage, extraction, summarization, and metadata writes.

use crate::{
    extraction::{ContentExtractor, DocumentFormat, ExtractionError, extract_blocking},
    ingestion::{
        sanitize::{supported_format, truncate_chars, validate_flat_filename},
        types::{
            BatchError, BatchReport, FileContent, FileListing, FileOutcome, FileSummary,
            IngestionError, OutcomeStatus, QueryError, SkipReason, UploadedFile,
        },
    },
    metrics::{IngestionMetrics, MetricsSnapshot},
    store::{FileMetadata, MetadataStore, NewFileRecord, StoreError},
    summarization::SummarizationClient,
};
use async_trait::async_trait;
use axum::body::Bytes;
use futures_util::future::join_all;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Characters of extracted text sent to the summarizer; the rest of the document is ignored.
pub const SUMMARY_INPUT_CHARS: usize = 4000;

/// Abstraction over the ingestion workflow and query surface used by the HTTP layer.
#[async_trait]
pub trait IngestionApi: Send + Sync {
    /// Ingest every file of a batch concurrently and partition the outcomes.
    async fn ingest_batch(&self, files: Vec<UploadedFile>) -> Result<BatchReport, BatchError>;

    /// List every stored file.
    async fn list_files(&self) -> Result<Vec<FileListing>, QueryError>;

    /// Fetch the stored summary of a file.
    async fn file_summary(&self, id: i32) -> Result<FileSummary, QueryError>;

    /// Extract the current content of a stored file.
    async fn file_content(&self, id: i32) -> Result<FileContent, QueryError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Runs the per-file ingestion pipeline and answers metadata queries.
///
/// Cloning is cheap: every clone shares the store pool, extractor, summarizer, and metrics, which
/// lets each file of a batch run as its own task.
#[derive(Clone)]
pub struct IngestionService {
    store: MetadataStore,
    extractor: Arc<dyn ContentExtractor>,
    summarizer: Arc<dyn SummarizationClient>,
    upload_dir: PathBuf,
    metrics: Arc<IngestionMetrics>,
}

/// A file that passed format and filename validation.
struct PlannedFile {
    name: String,
    format: DocumentFormat,
    path: PathBuf,
    bytes: Bytes,
}

enum Slot {
    Ready(FileOutcome),
    Running(String, JoinHandle<FileOutcome>),
}

impl Slot {
    async fn resolve(self) -> FileOutcome {
        match self {
            Slot::Ready(outcome) => outcome,
            Slot::Running(name, handle) => match handle.await {
                Ok(outcome) => outcome,
                Err(error) => {
                    tracing::error!(file = %name, error = %error, "Ingestion task failed");
                    FileOutcome::error(name, IngestionError::Task(error.to_string()))
                }
            },
        }
    }
}

impl IngestionService {
    /// Build a service storing uploads under `upload_dir`.
    pub fn new(
        store: MetadataStore,
        extractor: Arc<dyn ContentExtractor>,
        summarizer: Arc<dyn SummarizationClient>,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            extractor,
            summarizer,
            upload_dir: upload_dir.into(),
            metrics: Arc::new(IngestionMetrics::new()),
        }
    }

    /// Ingest a batch: validate, then run every remaining file as an independent task.
    ///
    /// All tasks are awaited before returning. A file whose task panics is reported as `error`
    /// without affecting its siblings. Fails with [`BatchError::NothingProcessed`] when no file
    /// reached the `processed` bucket.
    pub async fn ingest_batch(&self, files: Vec<UploadedFile>) -> Result<BatchReport, BatchError> {
        tracing::info!(files = files.len(), "Ingesting batch");
        let mut planned_paths = HashSet::new();
        let mut slots = Vec::with_capacity(files.len());

        for file in files {
            let slot = match self.plan(file) {
                Err(outcome) => Slot::Ready(outcome),
                Ok(planned) if !planned_paths.insert(planned.path.clone()) => {
                    Slot::Ready(FileOutcome::skipped(planned.name, SkipReason::AlreadyExists))
                }
                Ok(planned) => {
                    let name = planned.name.clone();
                    let service = self.clone();
                    Slot::Running(
                        name,
                        tokio::spawn(async move { service.ingest_planned(planned).await }),
                    )
                }
            };
            slots.push(slot);
        }

        let outcomes = join_all(slots.into_iter().map(Slot::resolve)).await;
        for outcome in &outcomes {
            self.record(outcome);
        }

        let report = BatchReport::from_outcomes(outcomes);
        tracing::info!(
            processed = report.processed.len(),
            skipped = report.skipped.len(),
            errored = report.errored.len(),
            "Batch completed"
        );
        if report.processed.is_empty() {
            return Err(BatchError::NothingProcessed(report));
        }
        Ok(report)
    }

    /// List every stored file in identifier order.
    pub async fn list_files(&self) -> Result<Vec<FileListing>, QueryError> {
        let rows = self.store.list().await?;
        Ok(rows
            .into_iter()
            .map(|row| FileListing {
                id: row.id,
                name: row.name,
                format: row.format,
                path: row.path,
            })
            .collect())
    }

    /// Fetch the stored summary of a file.
    pub async fn file_summary(&self, id: i32) -> Result<FileSummary, QueryError> {
        let row = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(QueryError::NotFound(id))?;
        Ok(FileSummary {
            id: row.id,
            summary: row.summary,
        })
    }

    /// Re-extract a stored file's content; nothing is cached.
    pub async fn file_content(&self, id: i32) -> Result<FileContent, QueryError> {
        let row = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(QueryError::ContentUnavailable(id))?;

        let path = PathBuf::from(&row.path);
        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|error| QueryError::Extraction(ExtractionError::Io(error)))?;
        if !exists {
            tracing::warn!(id, path = %row.path, "Stored file missing on disk");
            return Err(QueryError::ContentUnavailable(id));
        }

        let format = DocumentFormat::from_extension(&row.format).ok_or_else(|| {
            QueryError::Extraction(ExtractionError::Unsupported(format!(
                "stored format '{}' is not supported",
                row.format
            )))
        })?;

        let content = extract_blocking(Arc::clone(&self.extractor), path, format)
            .await
            .map_err(QueryError::Extraction)?;
        Ok(FileContent {
            id: row.id,
            content,
        })
    }

    /// Return the current ingestion metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn plan(&self, file: UploadedFile) -> Result<PlannedFile, FileOutcome> {
        let Some(format) = supported_format(file.name.trim()) else {
            return Err(FileOutcome::skipped(file.name, SkipReason::UnsupportedFormat));
        };
        let path = validate_flat_filename(&file.name).map(|flat| self.upload_dir.join(flat));
        let path = match path {
            Ok(path) => path,
            Err(error) => {
                return Err(FileOutcome::skipped(
                    file.name,
                    SkipReason::InvalidFilename(error.message()),
                ));
            }
        };
        Ok(PlannedFile {
            name: file.name,
            format,
            path,
            bytes: file.bytes,
        })
    }

    async fn ingest_planned(&self, file: PlannedFile) -> FileOutcome {
        let path = file.path.to_string_lossy().into_owned();
        match self.store.find_by_path(&path).await {
            Ok(Some(_)) => return FileOutcome::skipped(file.name, SkipReason::AlreadyExists),
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(file = %file.name, error = %error, "Duplicate check failed");
                return FileOutcome::error(file.name, error);
            }
        }

        match self.store_new_file(&file, &path).await {
            Ok(row) => {
                tracing::info!(file = %file.name, id = row.id, size = row.size, "File processed");
                FileOutcome {
                    name: file.name,
                    status: OutcomeStatus::Processed {
                        id: row.id,
                        path: row.path,
                        format: row.format,
                        size: row.size,
                        summary: row.summary.unwrap_or_default(),
                    },
                }
            }
            Err(IngestionError::Store(StoreError::DuplicatePath(_))) => {
                tracing::info!(file = %file.name, "Concurrent upload won the storage path");
                FileOutcome::skipped(file.name, SkipReason::AlreadyExists)
            }
            Err(error) => {
                tracing::warn!(file = %file.name, error = %error, "File processing failed");
                FileOutcome::error(file.name, error)
            }
        }
    }

    /// Write to a staging file, extract and summarize it, then move it into place and commit.
    async fn store_new_file(
        &self,
        file: &PlannedFile,
        path: &str,
    ) -> Result<FileMetadata, IngestionError> {
        let staged = StagedFile::new(staging_path(&file.path));
        tokio::fs::write(staged.path(), &file.bytes).await?;

        let content = extract_blocking(
            Arc::clone(&self.extractor),
            staged.path().to_path_buf(),
            file.format,
        )
        .await?;
        let summary = self
            .summarizer
            .summarize(truncate_chars(&content, SUMMARY_INPUT_CHARS))
            .await?;
        let size = tokio::fs::metadata(staged.path()).await?.len();

        let txn = self.store.begin().await?;
        let row = MetadataStore::insert(
            &txn,
            NewFileRecord {
                name: file.name.clone(),
                path: path.to_string(),
                format: file.format.as_str().to_string(),
                size: i64::try_from(size).unwrap_or(i64::MAX),
                summary,
            },
        )
        .await?;

        tokio::fs::rename(staged.path(), &file.path).await?;
        staged.persist();
        if let Err(error) = txn.commit().await {
            let _ = tokio::fs::remove_file(&file.path).await;
            return Err(StoreError::from(error).into());
        }
        Ok(row)
    }

    fn record(&self, outcome: &FileOutcome) {
        match outcome.status {
            OutcomeStatus::Processed { .. } => self.metrics.record_processed(),
            OutcomeStatus::Skipped { .. } => self.metrics.record_skipped(),
            OutcomeStatus::Error { .. } => self.metrics.record_errored(),
        }
    }
}

/// Staging file removed on drop unless it was moved into place.
struct StagedFile {
    path: PathBuf,
    persisted: bool,
}

impl StagedFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            persisted: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn persist(mut self) {
        self.persisted = true;
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.persisted {
            return;
        }
        if let Err(error) = std::fs::remove_file(&self.path) {
            if error.kind() != ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %error, "Failed to remove staging file");
            }
        }
    }
}

/// Hidden sibling of `path`; hidden names are never accepted as upload names.
fn staging_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{file_name}.{}.partial", uuid::Uuid::new_v4()))
}

#[async_trait]
impl IngestionApi for IngestionService {
    async fn ingest_batch(&self, files: Vec<UploadedFile>) -> Result<BatchReport, BatchError> {
        IngestionService::ingest_batch(self, files).await
    }

    async fn list_files(&self) -> Result<Vec<FileListing>, QueryError> {
        IngestionService::list_files(self).await
    }

    async fn file_summary(&self, id: i32) -> Result<FileSummary, QueryError> {
        IngestionService::file_summary(self, id).await
    }

    async fn file_content(&self, id: i32) -> Result<FileContent, QueryError> {
        IngestionService::file_content(self, id).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        IngestionService::metrics_snapshot(self)
    }
}
