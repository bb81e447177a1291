//! HTTP surface of the document summary service.
//!
//! - `POST /refresh` – Upload one or more documents (multipart field `files`). Each file is
//!   validated, stored, extracted, summarized and recorded; the response partitions the files
//!   into `processed_files`, `skipped_files` and `errored_files`. Responds 404 when no file was
//!   processed.
//! - `GET /files` – List stored files as `{id, name, format, path}`.
//! - `GET /files/{id}/summary` – Return `{id, summary}`.
//! - `GET /files/{id}/content` – Re-extract the stored file and return `{id, content}`.
//! - `GET /metrics` – Ingestion counters since startup.

use crate::ingestion::{
    BatchError, BatchReport, FileContent, FileListing, FileOutcome, FileSummary, IngestionApi,
    QueryError, UploadedFile,
};
use crate::metrics::MetricsSnapshot;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

const UPLOAD_FIELD: &str = "files";

/// Build the HTTP router; `body_limit` caps the size of upload requests in bytes.
pub fn create_router<S>(service: Arc<S>, body_limit: usize) -> Router
where
    S: IngestionApi + 'static,
{
    Router::new()
        .route("/refresh", post(refresh_files::<S>))
        .route("/files", get(list_files::<S>))
        .route("/files/:id/summary", get(get_file_summary::<S>))
        .route("/files/:id/content", get(get_file_content::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(service)
}

/// Success response for `POST /refresh`.
#[derive(Serialize)]
struct RefreshResponse {
    message: &'static str,
    processed_files: Vec<FileOutcome>,
    skipped_files: Vec<FileOutcome>,
    errored_files: Vec<FileOutcome>,
}

/// Ingest every uploaded file of the request concurrently.
async fn refresh_files<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<RefreshResponse>, AppError>
where
    S: IngestionApi,
{
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        files.push(UploadedFile { name, bytes });
    }

    if files.is_empty() {
        return Err(AppError::Unprocessable(format!(
            "Expected at least one file in the '{UPLOAD_FIELD}' field."
        )));
    }

    let BatchReport {
        processed,
        skipped,
        errored,
    } = service.ingest_batch(files).await?;
    Ok(Json(RefreshResponse {
        message: "Files processed successfully.",
        processed_files: processed,
        skipped_files: skipped,
        errored_files: errored,
    }))
}

async fn list_files<S>(State(service): State<Arc<S>>) -> Result<Json<Vec<FileListing>>, AppError>
where
    S: IngestionApi,
{
    Ok(Json(service.list_files().await?))
}

async fn get_file_summary<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<i32>,
) -> Result<Json<FileSummary>, AppError>
where
    S: IngestionApi,
{
    Ok(Json(service.file_summary(id).await?))
}

async fn get_file_content<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<i32>,
) -> Result<Json<FileContent>, AppError>
where
    S: IngestionApi,
{
    Ok(Json(service.file_content(id).await?))
}

async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: IngestionApi,
{
    Json(service.metrics_snapshot())
}

/// Request-level failures rendered as `{"detail": ...}` bodies.
enum AppError {
    Multipart(MultipartError),
    Unprocessable(String),
    NothingProcessed(String, BatchReport),
    NotFound(String),
    ExtractionFailed(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Multipart(error) => (
                error.status(),
                Json(json!({ "detail": format!("Multipart error: {}", error.body_text()) })),
            )
                .into_response(),
            AppError::Unprocessable(detail) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "detail": detail })))
                    .into_response()
            }
            AppError::NothingProcessed(detail, report) => (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "detail": detail,
                    "skipped_files": report.skipped,
                    "errored_files": report.errored,
                })),
            )
                .into_response(),
            AppError::NotFound(detail) => {
                (StatusCode::NOT_FOUND, Json(json!({ "detail": detail }))).into_response()
            }
            AppError::ExtractionFailed(detail) => {
                tracing::warn!(detail = %detail, "Content extraction failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": detail })),
                )
                    .into_response()
            }
            AppError::Internal(detail) => {
                tracing::error!(detail = %detail, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": "An unexpected error occurred." })),
                )
                    .into_response()
            }
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(inner: MultipartError) -> Self {
        Self::Multipart(inner)
    }
}

impl From<BatchError> for AppError {
    fn from(inner: BatchError) -> Self {
        let detail = inner.to_string();
        match inner {
            BatchError::NothingProcessed(report) => Self::NothingProcessed(detail, report),
        }
    }
}

impl From<QueryError> for AppError {
    fn from(inner: QueryError) -> Self {
        match inner {
            QueryError::NotFound(_) | QueryError::ContentUnavailable(_) => {
                Self::NotFound(inner.to_string())
            }
            QueryError::Extraction(_) => Self::ExtractionFailed(inner.to_string()),
            QueryError::Store(_) => Self::Internal(inner.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::create_router;
    use crate::extraction::ExtractionError;
    use crate::ingestion::{
        BatchError, BatchReport, FileContent, FileListing, FileOutcome, FileSummary,
        IngestionApi, OutcomeStatus, QueryError, SkipReason, UploadedFile,
    };
    use crate::metrics::MetricsSnapshot;
    use async_trait::async_trait;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const BOUNDARY: &str = "docsum-test-boundary";

    #[derive(Clone, Default)]
    struct StubIngestionService {
        uploads: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    }

    impl StubIngestionService {
        async fn recorded_uploads(&self) -> Vec<(String, Vec<u8>)> {
            self.uploads.lock().await.clone()
        }
    }

    #[async_trait]
    impl IngestionApi for StubIngestionService {
        async fn ingest_batch(
            &self,
            files: Vec<UploadedFile>,
        ) -> Result<BatchReport, BatchError> {
            let mut guard = self.uploads.lock().await;
            let outcomes: Vec<FileOutcome> = files
                .into_iter()
                .enumerate()
                .map(|(index, file)| {
                    guard.push((file.name.clone(), file.bytes.to_vec()));
                    if file.name.ends_with(".txt") {
                        FileOutcome {
                            name: file.name.clone(),
                            status: OutcomeStatus::Processed {
                                id: index as i32 + 1,
                                path: format!("uploaded_files/{}", file.name),
                                format: "txt".into(),
                                size: file.bytes.len() as i64,
                                summary: "A short summary".into(),
                            },
                        }
                    } else {
                        FileOutcome::skipped(file.name, SkipReason::UnsupportedFormat)
                    }
                })
                .collect();
            let report = BatchReport::from_outcomes(outcomes);
            if report.processed.is_empty() {
                return Err(BatchError::NothingProcessed(report));
            }
            Ok(report)
        }

        async fn list_files(&self) -> Result<Vec<FileListing>, QueryError> {
            Ok((1..=3)
                .map(|id| FileListing {
                    id,
                    name: format!("file{id}.txt"),
                    format: "txt".into(),
                    path: format!("uploaded_files/file{id}.txt"),
                })
                .collect())
        }

        async fn file_summary(&self, id: i32) -> Result<FileSummary, QueryError> {
            match id {
                1 => Ok(FileSummary {
                    id,
                    summary: Some("Short summary 1".into()),
                }),
                _ => Err(QueryError::NotFound(id)),
            }
        }

        async fn file_content(&self, id: i32) -> Result<FileContent, QueryError> {
            match id {
                1 => Ok(FileContent {
                    id,
                    content: "Hello, this is a test file.".into(),
                }),
                2 => Err(QueryError::Extraction(ExtractionError::Unsupported(
                    "broken".into(),
                ))),
                _ => Err(QueryError::ContentUnavailable(id)),
            }
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                files_processed: 4,
                files_skipped: 1,
                files_errored: 0,
            }
        }
    }

    fn app(service: &StubIngestionService) -> Router {
        create_router(Arc::new(service.clone()), 1024 * 1024)
    }

    fn multipart_request(field: &str, files: &[(&str, &str)]) -> Request<Body> {
        let mut body = String::new();
        for (name, content) in files {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{name}\"\r\nContent-Type: text/plain\r\n\r\n{content}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        Request::builder()
            .method(Method::POST)
            .uri("/refresh")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.expect("router response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn refresh_partitions_uploaded_files() {
        let service = StubIngestionService::default();
        let (status, json) = send(
            app(&service),
            multipart_request(
                "files",
                &[("test.txt", "This is a test file content."), ("image.png", "png")],
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Files processed successfully.");
        assert_eq!(json["processed_files"].as_array().map(Vec::len), Some(1));
        assert_eq!(json["processed_files"][0]["name"], "test.txt");
        assert_eq!(json["processed_files"][0]["status"], "processed");
        assert_eq!(json["skipped_files"][0]["reason"], "Unsupported format.");
        assert_eq!(json["errored_files"].as_array().map(Vec::len), Some(0));

        let uploads = service.recorded_uploads().await;
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0].0, "test.txt");
        assert_eq!(uploads[0].1, b"This is a test file content.");
    }

    #[tokio::test]
    async fn refresh_without_processed_files_is_not_found() {
        let service = StubIngestionService::default();
        let (status, json) = send(
            app(&service),
            multipart_request("files", &[("image.png", "png")]),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["detail"], "No valid or new files were processed.");
        assert_eq!(json["skipped_files"][0]["name"], "image.png");
    }

    #[tokio::test]
    async fn refresh_requires_files_field() {
        let service = StubIngestionService::default();
        let (status, _) = send(
            app(&service),
            multipart_request("attachment", &[("test.txt", "ignored")]),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(service.recorded_uploads().await.is_empty());
    }

    #[tokio::test]
    async fn list_returns_every_file() {
        let (status, json) = send(app(&StubIngestionService::default()), get("/files")).await;

        assert_eq!(status, StatusCode::OK);
        let files = json.as_array().expect("array");
        assert_eq!(files.len(), 3);
        assert_eq!(files[0]["name"], "file1.txt");
        assert_eq!(files[0]["format"], "txt");
        assert_eq!(files[0]["id"], 1);
    }

    #[tokio::test]
    async fn summary_route_reports_missing_ids() {
        let service = StubIngestionService::default();
        let (status, json) = send(app(&service), get("/files/1/summary")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["id"], 1);
        assert_eq!(json["summary"], "Short summary 1");

        let (status, json) = send(app(&service), get("/files/999/summary")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["detail"], "File not found.");
    }

    #[tokio::test]
    async fn content_route_maps_each_failure() {
        let service = StubIngestionService::default();
        let (status, json) = send(app(&service), get("/files/1/content")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["content"], "Hello, this is a test file.");

        let (status, json) = send(app(&service), get("/files/2/content")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(
            json["detail"]
                .as_str()
                .expect("detail")
                .starts_with("Failed to extract file content")
        );

        let (status, json) = send(app(&service), get("/files/3/content")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["detail"].as_str().expect("detail").contains("ID 3"));
    }

    #[tokio::test]
    async fn non_numeric_ids_are_rejected() {
        let (status, _) = send(
            app(&StubIngestionService::default()),
            get("/files/abc/summary"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn metrics_route_exposes_counters() {
        let (status, json) = send(app(&StubIngestionService::default()), get("/metrics")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["files_processed"], 4);
        assert_eq!(json["files_skipped"], 1);
    }
}
