//! Project metadata -- the single-row table holding input path and LLM config.

use rusqlite::{params, Connection, OptionalExtension};

use genglossary_core::time::{format_datetime, now_utc};

use crate::error::Result;
use crate::sqlite::store::SqliteStore;

/// The project's input path and configured LLM adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectMetadata {
    pub input_path: Option<String>,
    pub llm_provider: String,
    pub llm_model: String,
    pub llm_base_url: Option<String>,
}

impl Default for ProjectMetadata {
    fn default() -> Self {
        Self {
            input_path: None,
            llm_provider: "ollama".to_string(),
            llm_model: "llama3".to_string(),
            llm_base_url: None,
        }
    }
}

pub(crate) fn get_metadata_on_conn(conn: &Connection) -> Result<Option<ProjectMetadata>> {
    let row = conn
        .query_row(
            "SELECT input_path, llm_provider, llm_model, llm_base_url FROM metadata WHERE id = 1",
            [],
            |row| {
                Ok(ProjectMetadata {
                    input_path: row.get(0)?,
                    llm_provider: row.get(1)?,
                    llm_model: row.get(2)?,
                    llm_base_url: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

pub(crate) fn set_metadata_on_conn(conn: &Connection, metadata: &ProjectMetadata) -> Result<()> {
    conn.execute(
        "INSERT INTO metadata (id, input_path, llm_provider, llm_model, llm_base_url, updated_at)
         VALUES (1, ?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (id) DO UPDATE SET
            input_path = excluded.input_path,
            llm_provider = excluded.llm_provider,
            llm_model = excluded.llm_model,
            llm_base_url = excluded.llm_base_url,
            updated_at = excluded.updated_at",
        params![
            metadata.input_path,
            metadata.llm_provider,
            metadata.llm_model,
            metadata.llm_base_url,
            format_datetime(&now_utc()),
        ],
    )?;
    Ok(())
}

impl SqliteStore {
    /// Returns the project's metadata row, if it has ever been written.
    pub fn get_metadata(&self) -> Result<Option<ProjectMetadata>> {
        let conn = self.lock_conn()?;
        get_metadata_on_conn(&conn)
    }

    /// Creates or overwrites the project's single metadata row.
    pub fn set_metadata(&self, metadata: &ProjectMetadata) -> Result<()> {
        let conn = self.lock_conn()?;
        set_metadata_on_conn(&conn, metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_until_written() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.get_metadata().unwrap().is_none());
    }

    #[test]
    fn write_then_read() {
        let store = SqliteStore::open_in_memory().unwrap();
        let meta = ProjectMetadata {
            input_path: Some("/docs".into()),
            llm_provider: "openai_compatible".into(),
            llm_model: "gpt-oss".into(),
            llm_base_url: Some("http://localhost:1234/v1".into()),
        };
        store.set_metadata(&meta).unwrap();
        assert_eq!(store.get_metadata().unwrap(), Some(meta));
    }

    #[test]
    fn overwrite_replaces_single_row() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set_metadata(&ProjectMetadata::default()).unwrap();
        let second = ProjectMetadata {
            input_path: Some("/other".into()),
            ..ProjectMetadata::default()
        };
        store.set_metadata(&second).unwrap();
        assert_eq!(store.get_metadata().unwrap(), Some(second));

        let conn = store.lock_conn().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM metadata", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);
    }
}
