//! Generic, whitelisted batch insert.
//!
//! `batch_insert` is the only place a table name is interpolated into SQL
//! text. Both the table and its column list must appear in [`WHITELIST`];
//! callers never pass either through to this function unvalidated.

use rusqlite::{Connection, ToSql};

use crate::error::{Result, StorageError};

/// `(table, columns)` pairs this helper is allowed to write to.
const WHITELIST: &[(&str, &[&str])] = &[
    ("documents", &["file_name", "content", "content_hash", "created_at", "updated_at"]),
    ("terms_extracted", &["term_text", "category", "user_notes", "created_at"]),
    ("terms_excluded", &["term_text", "source", "created_at"]),
    ("terms_required", &["term_text", "source", "created_at"]),
    (
        "glossary_provisional",
        &["term_name", "definition", "confidence", "occurrences", "created_at"],
    ),
    (
        "glossary_refined",
        &["term_name", "definition", "confidence", "occurrences", "created_at"],
    ),
    (
        "glossary_issues",
        &["term_name", "issue_type", "description", "should_exclude", "exclusion_reason", "created_at"],
    ),
];

/// Chunk size kept well under SQLite's default `SQLITE_LIMIT_VARIABLE_NUMBER`
/// (32766) for any realistic column count.
const MAX_ROWS_PER_STATEMENT: usize = 500;

/// Inserts `rows` into `table` in as few multi-row `INSERT` statements as
/// SQLite's bound-variable limit allows. Returns an error if `table`/`columns`
/// are not on the whitelist, so this function never becomes an injection
/// vector for caller-controlled identifiers.
pub fn batch_insert(
    conn: &Connection,
    table: &str,
    columns: &[&str],
    rows: &[Vec<Box<dyn ToSql>>],
) -> Result<()> {
    let allowed = WHITELIST
        .iter()
        .find(|(t, _)| *t == table)
        .ok_or_else(|| StorageError::UnknownTable(table.to_owned()))?;
    if allowed.1 != columns {
        return Err(StorageError::UnknownTable(format!(
            "{table} (unrecognized column set {columns:?})"
        )));
    }
    if rows.is_empty() {
        return Ok(());
    }

    for chunk in rows.chunks(MAX_ROWS_PER_STATEMENT) {
        let placeholders = chunk
            .iter()
            .map(|_| format!("({})", vec!["?"; columns.len()].join(", ")))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES {placeholders}",
            columns.join(", ")
        );
        let params: Vec<&dyn ToSql> = chunk.iter().flat_map(|row| row.iter().map(|v| v.as_ref())).collect();
        conn.execute(&sql, params.as_slice())
            .map_err(|e| StorageError::from_rusqlite_insert(e, table))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_table() {
        let conn = Connection::open_in_memory().unwrap();
        let rows: Vec<Vec<Box<dyn ToSql>>> = vec![vec![Box::new("x")]];
        let result = batch_insert(&conn, "not_a_table", &["x"], &rows);
        assert!(matches!(result, Err(StorageError::UnknownTable(_))));
    }

    #[test]
    fn inserts_multiple_rows_in_one_statement() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE terms_extracted (id INTEGER PRIMARY KEY AUTOINCREMENT, term_text TEXT UNIQUE, category TEXT, user_notes TEXT, created_at TEXT)",
        )
        .unwrap();

        let rows: Vec<Vec<Box<dyn ToSql>>> = vec![
            vec![Box::new("alpha"), Box::new(Option::<String>::None), Box::new(""), Box::new("t0")],
            vec![Box::new("beta"), Box::new(Option::<String>::None), Box::new(""), Box::new("t0")],
        ];
        batch_insert(
            &conn,
            "terms_extracted",
            &["term_text", "category", "user_notes", "created_at"],
            &rows,
        )
        .unwrap();

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM terms_extracted", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn empty_rows_is_a_noop() {
        let conn = Connection::open_in_memory().unwrap();
        let rows: Vec<Vec<Box<dyn ToSql>>> = vec![];
        batch_insert(&conn, "documents", &["file_name", "content", "content_hash", "created_at", "updated_at"], &rows).unwrap();
    }
}
