//! Helpers for validating upload names and bounding summarizer input.

use crate::extraction::DocumentFormat;
use std::path::Path;

/// Reasons a client-supplied filename cannot be used as a storage path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilenameError {
    /// Filename is empty or whitespace-only.
    Empty,
    /// Filename contains path separators (`/` or `\`).
    ContainsPathSeparator,
    /// Filename is `..` or `.`.
    PathTraversal,
    /// Filename contains null bytes.
    NullByte,
    /// Filename starts with a dot (hidden file).
    Hidden,
    /// Filename contains control characters (CR, LF, etc.).
    ControlCharacter,
}

impl FilenameError {
    /// Returns a human-readable error message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "Invalid filename: filename cannot be empty.",
            Self::ContainsPathSeparator => "Invalid filename: path separators are not allowed.",
            Self::PathTraversal => "Invalid filename: '..' is not allowed.",
            Self::NullByte => "Invalid filename: null bytes are not allowed.",
            Self::Hidden => "Invalid filename: hidden files are not allowed.",
            Self::ControlCharacter => "Invalid filename: control characters are not allowed.",
        }
    }
}

/// Format implied by the filename's extension, if it is on the allow-list.
pub fn supported_format(file_name: &str) -> Option<DocumentFormat> {
    Path::new(file_name)
        .extension()
        .and_then(|extension| extension.to_str())
        .and_then(DocumentFormat::from_extension)
}

/// Validate a flat filename (no directory components) and return it trimmed.
pub fn validate_flat_filename(file_name: &str) -> Result<&str, FilenameError> {
    let trimmed = file_name.trim();

    if trimmed.is_empty() {
        return Err(FilenameError::Empty);
    }
    if trimmed.contains('\0') {
        return Err(FilenameError::NullByte);
    }
    if trimmed.chars().any(char::is_control) {
        return Err(FilenameError::ControlCharacter);
    }
    if trimmed.contains('/') || trimmed.contains('\\') {
        return Err(FilenameError::ContainsPathSeparator);
    }
    if trimmed == ".." || trimmed == "." {
        return Err(FilenameError::PathTraversal);
    }
    if trimmed.starts_with('.') {
        return Err(FilenameError::Hidden);
    }

    Ok(trimmed)
}

/// Longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_formats_follow_allow_list() {
        assert_eq!(supported_format("report.PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(supported_format("notes.txt"), Some(DocumentFormat::Txt));
        assert_eq!(supported_format("letter.doc"), Some(DocumentFormat::Doc));
        assert_eq!(supported_format("memo.docx"), Some(DocumentFormat::Docx));
        assert_eq!(supported_format("image.png"), None);
        assert_eq!(supported_format("archive.tar.gz"), None);
        assert_eq!(supported_format("README"), None);
        assert_eq!(supported_format(""), None);
    }

    #[test]
    fn flat_filenames_are_trimmed() {
        assert_eq!(validate_flat_filename("  notes.txt "), Ok("notes.txt"));
        assert_eq!(validate_flat_filename("my report.pdf"), Ok("my report.pdf"));
    }

    #[test]
    fn traversal_and_separators_are_rejected() {
        assert_eq!(
            validate_flat_filename("../../etc/passwd.txt"),
            Err(FilenameError::ContainsPathSeparator)
        );
        assert_eq!(
            validate_flat_filename("dir\\file.txt"),
            Err(FilenameError::ContainsPathSeparator)
        );
        assert_eq!(validate_flat_filename(".."), Err(FilenameError::PathTraversal));
        assert_eq!(validate_flat_filename(".env.txt"), Err(FilenameError::Hidden));
        assert_eq!(validate_flat_filename("a\0.txt"), Err(FilenameError::NullByte));
        assert_eq!(
            validate_flat_filename("a\r\n.txt"),
            Err(FilenameError::ControlCharacter)
        );
        assert_eq!(validate_flat_filename("   "), Err(FilenameError::Empty));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("", 3), "");
        let long = "ж".repeat(5000);
        assert_eq!(truncate_chars(&long, 4000).chars().count(), 4000);
    }
}
