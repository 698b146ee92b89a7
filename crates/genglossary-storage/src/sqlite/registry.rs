//! The process-wide Registry DB: a directory of projects and where their
//! individual project databases live.
//!
//! Structurally this mirrors [`super::store::SqliteStore`] (its own
//! connection, its own idempotent schema bootstrap) but owns a single table
//! with a much smaller lifecycle: projects are created, occasionally
//! updated/cloned, and deleted -- there is no transaction-heavy pipeline
//! writing through it.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::info;

use genglossary_core::enums::ProjectStatus;
use genglossary_core::time::{format_datetime, now_utc};

use crate::error::{Result, StorageError};

const CURRENT_SCHEMA_VERSION: i32 = 1;

const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS schema_state (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS projects (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        name         TEXT NOT NULL UNIQUE,
        doc_root     TEXT,
        db_path      TEXT NOT NULL UNIQUE,
        llm_provider TEXT NOT NULL DEFAULT 'ollama',
        llm_model    TEXT NOT NULL DEFAULT 'llama3',
        llm_base_url TEXT,
        status       TEXT NOT NULL DEFAULT 'created',
        created_at   TEXT NOT NULL,
        updated_at   TEXT NOT NULL,
        last_run_at  TEXT
    )
    "#,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRecord {
    pub id: i64,
    pub name: String,
    pub doc_root: Option<String>,
    pub db_path: String,
    pub llm_provider: String,
    pub llm_model: String,
    pub llm_base_url: Option<String>,
    pub status: ProjectStatus,
    pub created_at: String,
    pub updated_at: String,
    pub last_run_at: Option<String>,
}

fn scan_project(row: &rusqlite::Row) -> rusqlite::Result<ProjectRecord> {
    let status: String = row.get("status")?;
    Ok(ProjectRecord {
        id: row.get("id")?,
        name: row.get("name")?,
        doc_root: row.get("doc_root")?,
        db_path: row.get("db_path")?,
        llm_provider: row.get("llm_provider")?,
        llm_model: row.get("llm_model")?,
        llm_base_url: row.get("llm_base_url")?,
        status: status.parse().unwrap_or(ProjectStatus::Created),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        last_run_at: row.get("last_run_at")?,
    })
}

const PROJECT_COLUMNS: &str = "id, name, doc_root, db_path, llm_provider, llm_model, \
     llm_base_url, status, created_at, updated_at, last_run_at";

/// Fields a caller may change on an existing project. `None` leaves the
/// column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProjectUpdates {
    pub name: Option<String>,
    pub doc_root: Option<Option<String>>,
    pub llm_provider: Option<String>,
    pub llm_model: Option<String>,
    pub llm_base_url: Option<Option<String>>,
    pub status: Option<ProjectStatus>,
    pub last_run_at: Option<Option<String>>,
}

/// SQLite-backed process-wide project registry.
pub struct RegistryStore {
    conn: Mutex<Connection>,
}

impl RegistryStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(?path, "opening registry database");
        let conn = Connection::open(path)
            .map_err(|e| StorageError::Connection(format!("failed to open {}: {e}", path.display())))?;
        let store = Self { conn: Mutex::new(conn) };
        store.configure_connection()?;
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(format!("failed to open in-memory registry db: {e}")))?;
        let store = Self { conn: Mutex::new(conn) };
        store.configure_connection()?;
        store.init_schema()?;
        Ok(store)
    }

    fn configure_connection(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
            .map_err(|e| StorageError::Connection(format!("failed to set pragmas: {e}")))?;
        Ok(())
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        let version: std::result::Result<i32, _> = conn.query_row(
            "SELECT value FROM schema_state WHERE key = 'schema_version'",
            [],
            |row| {
                let v: String = row.get(0)?;
                Ok(v.parse::<i32>().unwrap_or(0))
            },
        );
        if let Ok(v) = version {
            if v >= CURRENT_SCHEMA_VERSION {
                return Ok(());
            }
        }
        for stmt in SCHEMA_STATEMENTS {
            conn.execute_batch(stmt).map_err(|e| StorageError::Migration {
                name: "registry_init_schema".into(),
                reason: e.to_string(),
            })?;
        }
        conn.execute(
            "INSERT OR REPLACE INTO schema_state (key, value) VALUES ('schema_version', ?1)",
            params![CURRENT_SCHEMA_VERSION.to_string()],
        )
        .map_err(|e| StorageError::Migration { name: "schema_version".into(), reason: e.to_string() })?;
        Ok(())
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| StorageError::Connection(format!("mutex poisoned: {e}")))
    }

    /// Registers a new project. Fails with `ConstraintViolation` if `name`
    /// or `db_path` already exist.
    pub fn create_project(
        &self,
        name: &str,
        doc_root: Option<&str>,
        db_path: &str,
        llm_provider: &str,
        llm_model: &str,
        llm_base_url: Option<&str>,
    ) -> Result<ProjectRecord> {
        let conn = self.lock_conn()?;
        let now = format_datetime(&now_utc());
        conn.execute(
            "INSERT INTO projects
                (name, doc_root, db_path, llm_provider, llm_model, llm_base_url, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'created', ?7, ?7)",
            params![name, doc_root, db_path, llm_provider, llm_model, llm_base_url, now],
        )
        .map_err(|e| StorageError::from_rusqlite_insert(e, "projects"))?;
        let id = conn.last_insert_rowid();
        get_by_id(&conn, id)?.ok_or_else(|| StorageError::Internal("project vanished after insert".into()))
    }

    pub fn get_project(&self, id: i64) -> Result<Option<ProjectRecord>> {
        get_by_id(&self.lock_conn()?, id)
    }

    pub fn get_project_by_name(&self, name: &str) -> Result<Option<ProjectRecord>> {
        self.lock_conn()?
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE name = ?1"),
                params![name],
                scan_project,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_projects(&self) -> Result<Vec<ProjectRecord>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY name"))?;
        let rows = stmt.query_map([], scan_project)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Name conflicts are checked up front so the caller (HTTP/CLI) can
    /// surface a specific "name taken" error rather than a raw constraint
    /// violation -- the update itself still relies on the UNIQUE index as
    /// the final authority.
    pub fn name_is_taken(&self, name: &str, excluding_id: Option<i64>) -> Result<bool> {
        let conn = self.lock_conn()?;
        let existing: Option<i64> = conn
            .query_row("SELECT id FROM projects WHERE name = ?1", params![name], |r| r.get(0))
            .optional()?;
        Ok(match (existing, excluding_id) {
            (Some(found), Some(excl)) => found != excl,
            (Some(_), None) => true,
            (None, _) => false,
        })
    }

    pub fn update_project(&self, id: i64, updates: &ProjectUpdates) -> Result<ProjectRecord> {
        let conn = self.lock_conn()?;
        let current = get_by_id(&conn, id)?.ok_or_else(|| StorageError::not_found("project", id.to_string()))?;

        let name = updates.name.clone().unwrap_or(current.name);
        let doc_root = updates.doc_root.clone().unwrap_or(current.doc_root);
        let llm_provider = updates.llm_provider.clone().unwrap_or(current.llm_provider);
        let llm_model = updates.llm_model.clone().unwrap_or(current.llm_model);
        let llm_base_url = updates.llm_base_url.clone().unwrap_or(current.llm_base_url);
        let status = updates.status.unwrap_or(current.status);
        let last_run_at = updates.last_run_at.clone().unwrap_or(current.last_run_at);
        let now = format_datetime(&now_utc());

        conn.execute(
            "UPDATE projects SET name = ?1, doc_root = ?2, llm_provider = ?3, llm_model = ?4,
                llm_base_url = ?5, status = ?6, last_run_at = ?7, updated_at = ?8
             WHERE id = ?9",
            params![name, doc_root, llm_provider, llm_model, llm_base_url, status.as_str(), last_run_at, now, id],
        )
        .map_err(|e| StorageError::from_rusqlite_insert(e, "projects"))?;

        get_by_id(&conn, id)?.ok_or_else(|| StorageError::not_found("project", id.to_string()))
    }

    /// Copies a project's settings into a new registry row pointing at
    /// `new_db_path`. `status` resets to `created` and `last_run_at` to
    /// null -- the clone has no run history of its own yet.
    pub fn clone_project(&self, id: i64, new_name: &str, new_db_path: &str) -> Result<ProjectRecord> {
        let source = self.get_project(id)?.ok_or_else(|| StorageError::not_found("project", id.to_string()))?;
        self.create_project(
            new_name,
            source.doc_root.as_deref(),
            new_db_path,
            &source.llm_provider,
            &source.llm_model,
            source.llm_base_url.as_deref(),
        )
    }

    /// Removes the registry row only. Never touches the project DB file on
    /// disk -- that decision belongs to the caller.
    pub fn delete_project(&self, id: i64) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        Ok(())
    }
}

fn get_by_id(conn: &Connection, id: i64) -> Result<Option<ProjectRecord>> {
    conn.query_row(&format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"), params![id], scan_project)
        .optional()
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_list() {
        let registry = RegistryStore::open_in_memory().unwrap();
        registry.create_project("docs", Some("/data/docs"), "/data/docs/project.db", "ollama", "llama3", None).unwrap();
        let projects = registry.list_projects().unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].status, ProjectStatus::Created);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let registry = RegistryStore::open_in_memory().unwrap();
        registry.create_project("docs", None, "/a/project.db", "ollama", "llama3", None).unwrap();
        let result = registry.create_project("docs", None, "/b/project.db", "ollama", "llama3", None);
        assert!(result.is_err());
    }

    #[test]
    fn clone_resets_status_and_last_run_at() {
        let registry = RegistryStore::open_in_memory().unwrap();
        let original = registry.create_project("docs", None, "/a/project.db", "ollama", "llama3", None).unwrap();
        registry
            .update_project(
                original.id,
                &ProjectUpdates { status: Some(ProjectStatus::Completed), last_run_at: Some(Some("2026-01-01T00:00:00.000Z".into())), ..Default::default() },
            )
            .unwrap();

        let cloned = registry.clone_project(original.id, "docs-copy", "/b/project.db").unwrap();
        assert_eq!(cloned.status, ProjectStatus::Created);
        assert!(cloned.last_run_at.is_none());
    }

    #[test]
    fn delete_removes_registry_row_only() {
        let registry = RegistryStore::open_in_memory().unwrap();
        let project = registry.create_project("docs", None, "/a/project.db", "ollama", "llama3", None).unwrap();
        registry.delete_project(project.id).unwrap();
        assert!(registry.get_project(project.id).unwrap().is_none());
    }

    #[test]
    fn name_is_taken_excludes_self() {
        let registry = RegistryStore::open_in_memory().unwrap();
        let project = registry.create_project("docs", None, "/a/project.db", "ollama", "llama3", None).unwrap();
        assert!(!registry.name_is_taken("docs", Some(project.id)).unwrap());
        assert!(registry.name_is_taken("docs", None).unwrap());
        assert!(!registry.name_is_taken("other", None).unwrap());
    }
}
