//! Validation rules shared by the storage, pipeline and boundary layers.
//!
//! These are pure functions over primitive inputs (paths, strings,
//! timestamps) rather than domain structs, since the checks here guard
//! input arriving from outside the process (uploaded file names, CLI flags,
//! HTTP bodies) rather than invariants on a single persisted record.

use std::path::{Component, Path};
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::enums::RunScope;

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("scope must be one of full, extract, generate, review, refine (got {0:?})")]
    InvalidScope(String),

    #[error("document path must be relative and contain no `..` segments: {0:?}")]
    PathTraversal(String),

    #[error("document path must be UTF-8 and non-empty")]
    EmptyPath,

    #[error("document exceeds the maximum size of {max_bytes} bytes (got {actual_bytes})")]
    DocumentTooLarge { max_bytes: u64, actual_bytes: u64 },

    #[error("file extension not allowed for document ingestion: {0:?}")]
    DisallowedExtension(String),

    #[error("file name matches the credential denylist: {0:?}")]
    DeniedFileName(String),

    #[error("timestamp must carry an explicit UTC offset")]
    NaiveTimestamp,

    #[error("project name must be non-empty and contain no path separators")]
    InvalidProjectName,

    #[error("term text must be non-empty")]
    EmptyTermText,
}

/// Parses a run scope string, rejecting anything outside the closed set.
pub fn parse_scope(s: &str) -> Result<RunScope, ValidationError> {
    RunScope::from_str(s).map_err(ValidationError::InvalidScope)
}

/// Maximum document size accepted by the filesystem loader, in bytes.
pub const MAX_DOCUMENT_BYTES: u64 = 5 * 1024 * 1024;

/// Extensions the filesystem document loader will ingest.
pub const ALLOWED_EXTENSIONS: &[&str] = &["txt", "md"];

/// Filename prefixes/patterns rejected outright, independent of extension.
const DENIED_NAME_PATTERNS: &[&str] = &[".env", ".git", "credentials", "id_rsa"];
const DENIED_EXTENSIONS: &[&str] = &["key", "pem"];

/// Validates a document's relative path for traversal, emptiness, and UTF-8.
///
/// `root`-relative paths must stay within `root`: no absolute paths, no
/// drive-letter prefixes, no `..` components.
pub fn validate_relative_doc_path(rel_path: &str) -> Result<(), ValidationError> {
    if rel_path.trim().is_empty() {
        return Err(ValidationError::EmptyPath);
    }
    let path = Path::new(rel_path);
    if path.is_absolute() {
        return Err(ValidationError::PathTraversal(rel_path.to_owned()));
    }
    for component in path.components() {
        match component {
            Component::Normal(_) => {}
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ValidationError::PathTraversal(rel_path.to_owned()));
            }
        }
    }
    Ok(())
}

/// Confirms a resolved, canonicalized document path is still inside `root`
/// after symlink resolution — the second half of the traversal check that
/// `validate_relative_doc_path` alone cannot perform (it only sees the
/// unresolved string).
pub fn validate_resolved_within_root(root: &Path, resolved: &Path) -> Result<(), ValidationError> {
    if resolved.starts_with(root) {
        Ok(())
    } else {
        Err(ValidationError::PathTraversal(resolved.display().to_string()))
    }
}

/// Validates a candidate file name against the extension allowlist and the
/// credential-like denylist.
pub fn validate_file_name(file_name: &str) -> Result<(), ValidationError> {
    let lower = file_name.to_ascii_lowercase();
    for pattern in DENIED_NAME_PATTERNS {
        if lower.contains(pattern) {
            return Err(ValidationError::DeniedFileName(file_name.to_owned()));
        }
    }
    let ext = Path::new(&lower)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    if DENIED_EXTENSIONS.contains(&ext) {
        return Err(ValidationError::DeniedFileName(file_name.to_owned()));
    }
    if !ALLOWED_EXTENSIONS.contains(&ext) {
        return Err(ValidationError::DisallowedExtension(ext.to_owned()));
    }
    Ok(())
}

/// Validates a document's byte length against [`MAX_DOCUMENT_BYTES`].
pub fn validate_document_size(len_bytes: u64) -> Result<(), ValidationError> {
    if len_bytes > MAX_DOCUMENT_BYTES {
        return Err(ValidationError::DocumentTooLarge {
            max_bytes: MAX_DOCUMENT_BYTES,
            actual_bytes: len_bytes,
        });
    }
    Ok(())
}

/// Confirms a timestamp carries explicit UTC; `DateTime<Utc>` always does
/// by construction, so this exists to validate values parsed from
/// caller-supplied strings before they are converted.
pub fn validate_timestamp_has_offset(raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    crate::time::parse_datetime(raw).ok_or(ValidationError::NaiveTimestamp)
}

/// Validates a project name: non-empty, no path separators.
pub fn validate_project_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() || name.contains('/') || name.contains('\\') {
        return Err(ValidationError::InvalidProjectName);
    }
    Ok(())
}

/// Validates term text is non-empty after trimming.
pub fn validate_term_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyTermText);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_parent_dir_traversal() {
        assert!(validate_relative_doc_path("../../etc/passwd").is_err());
    }

    #[test]
    fn rejects_absolute_path() {
        assert!(validate_relative_doc_path("/etc/passwd").is_err());
    }

    #[test]
    fn accepts_nested_relative_path() {
        assert!(validate_relative_doc_path("docs/guide.md").is_ok());
    }

    #[test]
    fn rejects_disallowed_extension() {
        assert!(matches!(
            validate_file_name("notes.pdf"),
            Err(ValidationError::DisallowedExtension(_))
        ));
    }

    #[test]
    fn rejects_credential_like_names() {
        assert!(validate_file_name(".env").is_err());
        assert!(validate_file_name("server.pem").is_err());
        assert!(validate_file_name("credentials.txt").is_err());
    }

    #[test]
    fn accepts_plain_markdown() {
        assert!(validate_file_name("glossary-notes.md").is_ok());
    }

    #[test]
    fn rejects_oversized_document() {
        assert!(validate_document_size(MAX_DOCUMENT_BYTES + 1).is_err());
    }

    #[test]
    fn parse_scope_accepts_known_values() {
        assert!(parse_scope("full").is_ok());
        assert!(parse_scope("extract").is_ok());
        assert!(parse_scope("nonsense").is_err());
    }

    #[test]
    fn resolved_path_outside_root_rejected() {
        let root = Path::new("/data/project/docs");
        let resolved = Path::new("/etc/passwd");
        assert!(validate_resolved_within_root(root, resolved).is_err());
    }
}
