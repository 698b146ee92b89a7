//! Term extraction/classification state: `terms_extracted`, `terms_excluded`,
//! `terms_required`, and the unified `list_all_terms` view over them.

use std::collections::{HashMap, HashSet};

use rusqlite::{params, Connection};
use serde::Serialize;

use genglossary_core::enums::TermSource;
use genglossary_core::time::{format_datetime, now_utc};

use crate::error::{Result, StorageError};
use crate::sqlite::store::SqliteStore;

/// The only tables `insert_override`/`list_override`/`term_set` may touch --
/// their table name is interpolated into SQL, so this whitelist is the only
/// barrier against an unexpected value reaching the query string.
const OVERRIDE_TABLES: &[&str] = &["terms_excluded", "terms_required"];

fn check_override_table(table: &str) -> Result<()> {
    if OVERRIDE_TABLES.contains(&table) {
        Ok(())
    } else {
        Err(StorageError::UnknownTable(table.to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedTerm {
    pub id: i64,
    pub term_text: String,
    pub category: Option<String>,
    pub user_notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermOverride {
    pub id: i64,
    pub term_text: String,
    pub source: TermSource,
}

/// A row from the unified term listing (`list_all_terms`).
///
/// `id` is the `terms_extracted` row id for extracted terms, or the
/// negation of the `terms_required` row id for terms that are required but
/// were never extracted (no positive id exists for them).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedTerm {
    pub id: i64,
    pub term_text: String,
    pub category: Option<String>,
}

pub(crate) fn clear_extracted_on_conn(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM terms_extracted", [])?;
    Ok(())
}

pub(crate) fn insert_extracted_on_conn(
    conn: &Connection,
    term_text: &str,
    category: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO terms_extracted (term_text, category, user_notes, created_at)
         VALUES (?1, ?2, '', ?3)
         ON CONFLICT (term_text) DO UPDATE SET category = excluded.category",
        params![term_text, category, format_datetime(&now_utc())],
    )?;
    Ok(())
}

pub(crate) fn list_extracted_on_conn(conn: &Connection) -> Result<Vec<ExtractedTerm>> {
    let mut stmt = conn.prepare(
        "SELECT id, term_text, category, user_notes FROM terms_extracted ORDER BY term_text",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(ExtractedTerm {
            id: row.get(0)?,
            term_text: row.get(1)?,
            category: row.get(2)?,
            user_notes: row.get(3)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Returns `{term_text -> user_notes}` for every term with non-empty notes.
///
/// Call before a destructive re-extraction; pair with
/// [`restore_user_notes_on_conn`] afterwards.
pub(crate) fn backup_user_notes_on_conn(conn: &Connection) -> Result<HashMap<String, String>> {
    let mut stmt = conn.prepare(
        "SELECT term_text, user_notes FROM terms_extracted WHERE user_notes != ''",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
    let mut map = HashMap::new();
    for row in rows {
        let (text, notes) = row?;
        map.insert(text, notes);
    }
    Ok(map)
}

pub(crate) fn restore_user_notes_on_conn(
    conn: &Connection,
    notes: &HashMap<String, String>,
) -> Result<()> {
    for (term_text, user_notes) in notes {
        conn.execute(
            "UPDATE terms_extracted SET user_notes = ?1 WHERE term_text = ?2",
            params![user_notes, term_text],
        )?;
    }
    Ok(())
}

fn insert_override(
    conn: &Connection,
    table: &str,
    term_text: &str,
    source: TermSource,
) -> Result<()> {
    check_override_table(table)?;
    let sql = format!(
        "INSERT INTO {table} (term_text, source, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT (term_text) DO UPDATE SET source = excluded.source"
    );
    conn.execute(&sql, params![term_text, source.as_str(), format_datetime(&now_utc())])?;
    Ok(())
}

fn list_override(conn: &Connection, table: &str) -> Result<Vec<TermOverride>> {
    check_override_table(table)?;
    let sql = format!("SELECT id, term_text, source FROM {table} ORDER BY term_text");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        let source: String = row.get(2)?;
        Ok(TermOverride {
            id: row.get(0)?,
            term_text: row.get(1)?,
            source: source.parse().unwrap_or(TermSource::Manual),
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn term_set(conn: &Connection, table: &str) -> Result<HashSet<String>> {
    check_override_table(table)?;
    let sql = format!("SELECT term_text FROM {table}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    Ok(rows.collect::<rusqlite::Result<HashSet<_>>>()?)
}

pub(crate) fn exclude_term_on_conn(conn: &Connection, term_text: &str, source: TermSource) -> Result<()> {
    insert_override(conn, "terms_excluded", term_text, source)
}

pub(crate) fn require_term_on_conn(conn: &Connection, term_text: &str, source: TermSource) -> Result<()> {
    insert_override(conn, "terms_required", term_text, source)
}

pub(crate) fn list_excluded_on_conn(conn: &Connection) -> Result<Vec<TermOverride>> {
    list_override(conn, "terms_excluded")
}

pub(crate) fn list_required_on_conn(conn: &Connection) -> Result<Vec<TermOverride>> {
    list_override(conn, "terms_required")
}

/// Builds the unified term listing: `(extracted ∪ required) \ (excluded \ required)`,
/// sorted by term text. Terms required-but-never-extracted get a synthetic
/// negative id (the negation of their `terms_required` row id).
pub(crate) fn list_all_terms_on_conn(conn: &Connection) -> Result<Vec<ListedTerm>> {
    let extracted = list_extracted_on_conn(conn)?;
    let excluded = term_set(conn, "terms_excluded")?;
    let required = list_override(conn, "terms_required")?;
    let required_set: HashSet<&str> = required.iter().map(|r| r.term_text.as_str()).collect();

    let mut out = Vec::new();
    let mut seen = HashSet::new();

    for term in &extracted {
        let is_excluded = excluded.contains(&term.term_text) && !required_set.contains(term.term_text.as_str());
        if is_excluded {
            continue;
        }
        seen.insert(term.term_text.clone());
        out.push(ListedTerm {
            id: term.id,
            term_text: term.term_text.clone(),
            category: term.category.clone(),
        });
    }

    for req in &required {
        if seen.contains(&req.term_text) {
            continue;
        }
        out.push(ListedTerm {
            id: -req.id,
            term_text: req.term_text.clone(),
            category: None,
        });
    }

    out.sort_by(|a, b| a.term_text.cmp(&b.term_text));
    Ok(out)
}

impl SqliteStore {
    pub fn clear_extracted_terms(&self) -> Result<()> {
        clear_extracted_on_conn(&self.lock_conn()?)
    }

    pub fn insert_extracted_term(&self, term_text: &str, category: Option<&str>) -> Result<()> {
        insert_extracted_on_conn(&self.lock_conn()?, term_text, category)
    }

    pub fn list_extracted_terms(&self) -> Result<Vec<ExtractedTerm>> {
        list_extracted_on_conn(&self.lock_conn()?)
    }

    pub fn backup_user_notes(&self) -> Result<HashMap<String, String>> {
        backup_user_notes_on_conn(&self.lock_conn()?)
    }

    pub fn restore_user_notes(&self, notes: &HashMap<String, String>) -> Result<()> {
        restore_user_notes_on_conn(&self.lock_conn()?, notes)
    }

    pub fn exclude_term(&self, term_text: &str, source: TermSource) -> Result<()> {
        exclude_term_on_conn(&self.lock_conn()?, term_text, source)
    }

    pub fn require_term(&self, term_text: &str, source: TermSource) -> Result<()> {
        require_term_on_conn(&self.lock_conn()?, term_text, source)
    }

    pub fn list_excluded_terms(&self) -> Result<Vec<TermOverride>> {
        list_excluded_on_conn(&self.lock_conn()?)
    }

    pub fn list_required_terms(&self) -> Result<Vec<TermOverride>> {
        list_required_on_conn(&self.lock_conn()?)
    }

    pub fn list_all_terms(&self) -> Result<Vec<ListedTerm>> {
        list_all_terms_on_conn(&self.lock_conn()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_overrides_excluded_in_unified_view() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_extracted_term("widget", Some("noun")).unwrap();
        store.exclude_term("widget", TermSource::Auto).unwrap();
        store.require_term("widget", TermSource::Manual).unwrap();

        let all = store.list_all_terms().unwrap();
        assert!(all.iter().any(|t| t.term_text == "widget"));
    }

    #[test]
    fn excluded_without_required_is_hidden() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_extracted_term("gadget", None).unwrap();
        store.exclude_term("gadget", TermSource::Auto).unwrap();

        let all = store.list_all_terms().unwrap();
        assert!(!all.iter().any(|t| t.term_text == "gadget"));
    }

    #[test]
    fn required_only_term_gets_negative_synthetic_id() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.require_term("gizmo", TermSource::Manual).unwrap();

        let all = store.list_all_terms().unwrap();
        let entry = all.iter().find(|t| t.term_text == "gizmo").unwrap();
        assert!(entry.id < 0);
    }

    #[test]
    fn excluded_listing_shows_raw_rows_even_if_also_required() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.exclude_term("widget", TermSource::Auto).unwrap();
        store.require_term("widget", TermSource::Manual).unwrap();

        let excluded = store.list_excluded_terms().unwrap();
        assert!(excluded.iter().any(|t| t.term_text == "widget"));
    }

    #[test]
    fn backup_and_restore_user_notes_round_trips() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_extracted_term("widget", None).unwrap();
        store.restore_user_notes(&HashMap::from([("widget".to_string(), "keep this".to_string())])).unwrap();

        let backup = store.backup_user_notes().unwrap();
        assert_eq!(backup.get("widget"), Some(&"keep this".to_string()));

        store.clear_extracted_terms().unwrap();
        store.insert_extracted_term("widget", Some("noun")).unwrap();
        store.restore_user_notes(&backup).unwrap();

        let terms = store.list_extracted_terms().unwrap();
        assert_eq!(terms[0].user_notes, "keep this");
    }

    #[test]
    fn override_table_outside_whitelist_is_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let conn = store.lock_conn().unwrap();
        let result = insert_override(&conn, "sqlite_master", "widget", TermSource::Manual);
        assert!(matches!(result, Err(crate::error::StorageError::UnknownTable(_))));
        let result = list_override(&conn, "sqlite_master");
        assert!(matches!(result, Err(crate::error::StorageError::UnknownTable(_))));
    }

    #[test]
    fn list_all_terms_is_sorted_and_deduplicated() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_extracted_term("zeta", None).unwrap();
        store.insert_extracted_term("alpha", None).unwrap();
        store.require_term("alpha", TermSource::Manual).unwrap();

        let all = store.list_all_terms().unwrap();
        let texts: Vec<&str> = all.iter().map(|t| t.term_text.as_str()).collect();
        assert_eq!(texts, vec!["alpha", "zeta"]);
    }
}
