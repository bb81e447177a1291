//! Plain-text extraction for stored documents.
//!
//! Extraction is CPU-bound and synchronous; async callers run it on the blocking pool.

mod docx;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Document formats accepted for ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    /// Portable Document Format.
    Pdf,
    /// Office Open XML word processing document.
    Docx,
    /// Legacy Word document.
    Doc,
    /// Plain UTF-8 text.
    Txt,
}

impl DocumentFormat {
    /// Map a file extension (without the leading dot, any case) to a supported format.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "doc" => Some(Self::Doc),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }

    /// Lowercase extension without the leading dot, as persisted in the store.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Doc => "doc",
            Self::Txt => "txt",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while extracting text from a stored file.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The file could not be read.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// The file's internal structure is not one this extractor understands.
    #[error("Unsupported document: {0}")]
    Unsupported(String),
    /// The file claims a supported format but its contents are damaged.
    #[error("Failed to extract {format} content: {message}")]
    Corrupt {
        /// Format the file was parsed as.
        format: DocumentFormat,
        /// Parser diagnostic.
        message: String,
    },
    /// The extraction task panicked or was cancelled.
    #[error("Extraction aborted: {0}")]
    Aborted(String),
}

/// Interface implemented by text extractors.
pub trait ContentExtractor: Send + Sync {
    /// Return the plain-text content of the file at `path`, parsed as `format`.
    fn extract(&self, path: &Path, format: DocumentFormat) -> Result<String, ExtractionError>;
}

/// Run `extractor` on the blocking thread pool.
///
/// A panic inside the extractor surfaces as [`ExtractionError::Aborted`].
pub async fn extract_blocking(
    extractor: Arc<dyn ContentExtractor>,
    path: PathBuf,
    format: DocumentFormat,
) -> Result<String, ExtractionError> {
    tokio::task::spawn_blocking(move || extractor.extract(&path, format))
        .await
        .map_err(|error| ExtractionError::Aborted(error.to_string()))?
}

/// Extractor reading documents straight from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsContentExtractor;

impl FsContentExtractor {
    /// Construct a filesystem-backed extractor.
    pub const fn new() -> Self {
        Self
    }
}

impl ContentExtractor for FsContentExtractor {
    fn extract(&self, path: &Path, format: DocumentFormat) -> Result<String, ExtractionError> {
        let data = std::fs::read(path)?;
        tracing::debug!(path = %path.display(), %format, bytes = data.len(), "Extracting content");
        match format {
            DocumentFormat::Txt => decode_utf8(data, format),
            DocumentFormat::Pdf => extract_pdf(&data),
            DocumentFormat::Docx => docx::extract_docx(&data),
            DocumentFormat::Doc => extract_doc(data),
        }
    }
}

fn decode_utf8(data: Vec<u8>, format: DocumentFormat) -> Result<String, ExtractionError> {
    String::from_utf8(data).map_err(|error| ExtractionError::Corrupt {
        format,
        message: format!("content is not valid UTF-8: {error}"),
    })
}

fn extract_pdf(data: &[u8]) -> Result<String, ExtractionError> {
    pdf_extract::extract_text_from_mem(data).map_err(|error| ExtractionError::Corrupt {
        format: DocumentFormat::Pdf,
        message: error.to_string(),
    })
}

/// `.doc` uploads are frequently DOCX or text files under an old extension; only the genuine
/// Word 97-2003 binary container is refused.
fn extract_doc(data: Vec<u8>) -> Result<String, ExtractionError> {
    if data.starts_with(ZIP_MAGIC) {
        return docx::extract_docx(&data);
    }
    if data.starts_with(OLE_MAGIC) {
        return Err(ExtractionError::Unsupported(
            "legacy Word 97-2003 binary documents cannot be extracted; save the file as .docx"
                .into(),
        ));
    }
    decode_utf8(data, DocumentFormat::Doc)
}
