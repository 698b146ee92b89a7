//! Document loading: the `documents` table first, the filesystem second.

use std::path::{Path, PathBuf};

use genglossary_core::validation::{
    validate_document_size, validate_file_name, validate_relative_doc_path,
    validate_resolved_within_root, ValidationError,
};
use genglossary_storage::{Document, SqliteStore};

use crate::error::{PipelineError, Result};

/// Loads the document set the Extract stage should run against.
///
/// 1. If `documents` already has rows (GUI/API mode, where documents were
///    uploaded directly), those rows are authoritative.
/// 2. Otherwise, if `doc_root` is set, walk it for `.txt`/`.md` files,
///    validate each, and insert them.
/// 3. If both are empty, fail -- there is nothing to extract from.
pub fn load_documents(store: &SqliteStore, doc_root: Option<&Path>) -> Result<Vec<Document>> {
    let existing = store.list_documents()?;
    if !existing.is_empty() {
        return Ok(existing);
    }

    let Some(root) = doc_root else {
        return Err(PipelineError::Validation(ValidationError::EmptyPath));
    };
    let root = root
        .canonicalize()
        .map_err(|e| PipelineError::Internal(format!("doc_root {} is not accessible: {e}", root.display())))?;

    let mut loaded = Vec::new();
    for rel_path in walk_relative_paths(&root)? {
        let rel_str = rel_path.to_string_lossy().replace('\\', "/");
        validate_relative_doc_path(&rel_str)?;

        let file_name = rel_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        validate_file_name(file_name)?;

        let absolute = root.join(&rel_path);
        let resolved = absolute
            .canonicalize()
            .map_err(|e| PipelineError::Internal(format!("failed to resolve {}: {e}", absolute.display())))?;
        validate_resolved_within_root(&root, &resolved)?;

        let content = std::fs::read_to_string(&resolved)
            .map_err(|e| PipelineError::Internal(format!("failed to read {}: {e}", resolved.display())))?;
        validate_document_size(content.len() as u64)?;

        let document = store.upsert_document_by_path(&rel_str, &content)?;
        loaded.push(document);
    }

    if loaded.is_empty() {
        return Err(PipelineError::Validation(ValidationError::EmptyPath));
    }
    Ok(loaded)
}

/// Recursively walks `root`, returning paths relative to it for every entry
/// whose extension passes [`validate_file_name`] (others are skipped, not
/// rejected, since a doc root may legitimately contain unrelated files).
fn walk_relative_paths(root: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    walk_into(root, root, &mut out)?;
    out.sort();
    Ok(out)
}

fn walk_into(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| PipelineError::Internal(format!("failed to read directory {}: {e}", dir.display())))?;
    for entry in entries {
        let entry = entry.map_err(|e| PipelineError::Internal(format!("directory walk failed: {e}")))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|e| PipelineError::Internal(format!("failed to stat {}: {e}", path.display())))?;
        if file_type.is_dir() {
            walk_into(root, &path, out)?;
        } else if file_type.is_file() {
            let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if validate_file_name(file_name).is_ok() {
                if let Ok(rel) = path.strip_prefix(root) {
                    out.push(rel.to_path_buf());
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_documents_take_priority_over_filesystem() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_document_by_path("already-there.md", "hi").unwrap();

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("on-disk.md"), "from disk").unwrap();

        let docs = load_documents(&store, Some(dir.path())).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].file_name, "already-there.md");
    }

    #[test]
    fn filesystem_fallback_loads_allowed_extensions_only() {
        let store = SqliteStore::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("guide.md"), "hello world").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "more text").unwrap();
        std::fs::write(dir.path().join("image.png"), "binary").unwrap();

        let docs = load_documents(&store, Some(dir.path())).unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.file_name.as_str()).collect();
        assert!(names.contains(&"guide.md"));
        assert!(names.contains(&"notes.txt"));
        assert!(!names.contains(&"image.png"));
    }

    #[test]
    fn filesystem_fallback_recurses_into_subdirectories() {
        let store = SqliteStore::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/nested.md"), "nested content").unwrap();

        let docs = load_documents(&store, Some(dir.path())).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].file_name, "sub/nested.md");
    }

    #[test]
    fn no_documents_and_no_doc_root_is_an_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = load_documents(&store, None);
        assert!(result.is_err());
    }

    #[test]
    fn empty_doc_root_is_an_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let result = load_documents(&store, Some(dir.path()));
        assert!(result.is_err());
    }
}
