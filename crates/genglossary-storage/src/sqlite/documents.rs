//! Document repository.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use genglossary_core::content_hash::compute_content_hash;
use genglossary_core::time::{format_datetime, now_utc};

use crate::error::{Result, StorageError};
use crate::sqlite::store::SqliteStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub id: i64,
    pub file_name: String,
    pub content: String,
    pub content_hash: String,
}

fn scan_document(row: &rusqlite::Row) -> rusqlite::Result<Document> {
    Ok(Document {
        id: row.get("id")?,
        file_name: row.get("file_name")?,
        content: row.get("content")?,
        content_hash: row.get("content_hash")?,
    })
}

pub(crate) fn list_documents_on_conn(conn: &Connection) -> Result<Vec<Document>> {
    let mut stmt = conn.prepare(
        "SELECT id, file_name, content, content_hash FROM documents ORDER BY file_name",
    )?;
    let rows = stmt.query_map([], scan_document)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Inserts a document, or updates its content/hash if `file_name` already
/// exists. Used by the filesystem-fallback loader so re-running extraction
/// against changed files on disk does not duplicate rows.
pub(crate) fn upsert_by_path_on_conn(conn: &Connection, file_name: &str, content: &str) -> Result<Document> {
    let hash = compute_content_hash(content);
    let now = format_datetime(&now_utc());

    conn.execute(
        "INSERT INTO documents (file_name, content, content_hash, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)
         ON CONFLICT (file_name) DO UPDATE SET
            content = excluded.content,
            content_hash = excluded.content_hash,
            updated_at = excluded.updated_at",
        params![file_name, content, hash, now],
    )?;

    conn.query_row(
        "SELECT id, file_name, content, content_hash FROM documents WHERE file_name = ?1",
        params![file_name],
        scan_document,
    )
    .map_err(StorageError::from)
}

pub(crate) fn get_document_by_path_on_conn(conn: &Connection, file_name: &str) -> Result<Option<Document>> {
    conn.query_row(
        "SELECT id, file_name, content, content_hash FROM documents WHERE file_name = ?1",
        params![file_name],
        scan_document,
    )
    .optional()
    .map_err(StorageError::from)
}

pub(crate) fn clear_documents_on_conn(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM documents", [])?;
    Ok(())
}

impl SqliteStore {
    pub fn list_documents(&self) -> Result<Vec<Document>> {
        let conn = self.lock_conn()?;
        list_documents_on_conn(&conn)
    }

    pub fn upsert_document_by_path(&self, file_name: &str, content: &str) -> Result<Document> {
        let conn = self.lock_conn()?;
        upsert_by_path_on_conn(&conn, file_name, content)
    }

    pub fn get_document_by_path(&self, file_name: &str) -> Result<Option<Document>> {
        let conn = self.lock_conn()?;
        get_document_by_path_on_conn(&conn, file_name)
    }

    pub fn clear_documents(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        clear_documents_on_conn(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_then_list() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_document_by_path("guide.md", "hello").unwrap();
        let docs = store.list_documents().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "hello");
    }

    #[test]
    fn upsert_same_path_updates_content_and_hash() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = store.upsert_document_by_path("guide.md", "v1").unwrap();
        let second = store.upsert_document_by_path("guide.md", "v2").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.content, "v2");
        assert_ne!(first.content_hash, second.content_hash);
        assert_eq!(store.list_documents().unwrap().len(), 1);
    }

    #[test]
    fn clear_removes_all() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_document_by_path("a.md", "a").unwrap();
        store.upsert_document_by_path("b.md", "b").unwrap();
        store.clear_documents().unwrap();
        assert!(store.list_documents().unwrap().is_empty());
    }
}
