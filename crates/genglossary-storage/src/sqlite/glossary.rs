//! Glossary tables: `glossary_provisional`, `glossary_refined` (via a
//! table-parameterized generic repository) and `glossary_issues`.

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use genglossary_core::enums::IssueType;
use genglossary_core::time::{format_datetime, now_utc};

use crate::error::{Result, StorageError};
use crate::sqlite::store::SqliteStore;

/// One location a term was observed at, carried as JSON in `occurrences`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    pub document_path: String,
    pub line_number: u32,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlossaryEntry {
    pub id: i64,
    pub term_name: String,
    pub definition: String,
    pub confidence: f64,
    pub occurrences: Vec<Occurrence>,
}

/// The two tables sharing this shape. Any other value is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlossaryStage {
    Provisional,
    Refined,
}

impl GlossaryStage {
    fn table(self) -> &'static str {
        match self {
            GlossaryStage::Provisional => "glossary_provisional",
            GlossaryStage::Refined => "glossary_refined",
        }
    }
}

fn scan_entry(row: &rusqlite::Row) -> rusqlite::Result<GlossaryEntry> {
    let occurrences_json: String = row.get("occurrences")?;
    let occurrences = serde_json::from_str(&occurrences_json).unwrap_or_default();
    Ok(GlossaryEntry {
        id: row.get("id")?,
        term_name: row.get("term_name")?,
        definition: row.get("definition")?,
        confidence: row.get("confidence")?,
        occurrences,
    })
}

pub(crate) fn clear_glossary_on_conn(conn: &Connection, stage: GlossaryStage) -> Result<()> {
    conn.execute(&format!("DELETE FROM {}", stage.table()), [])?;
    Ok(())
}

pub(crate) fn insert_glossary_entry_on_conn(
    conn: &Connection,
    stage: GlossaryStage,
    term_name: &str,
    definition: &str,
    confidence: f64,
    occurrences: &[Occurrence],
) -> Result<()> {
    let occurrences_json = serde_json::to_string(occurrences)?;
    let sql = format!(
        "INSERT INTO {} (term_name, definition, confidence, occurrences, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (term_name) DO UPDATE SET
            definition = excluded.definition,
            confidence = excluded.confidence,
            occurrences = excluded.occurrences",
        stage.table()
    );
    conn.execute(
        &sql,
        params![term_name, definition, confidence, occurrences_json, format_datetime(&now_utc())],
    )
    .map_err(|e| StorageError::from_rusqlite_insert(e, stage.table()))?;
    Ok(())
}

pub(crate) fn list_glossary_on_conn(conn: &Connection, stage: GlossaryStage) -> Result<Vec<GlossaryEntry>> {
    let sql = format!("SELECT id, term_name, definition, confidence, occurrences FROM {} ORDER BY term_name", stage.table());
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], scan_entry)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Copies `glossary_provisional` verbatim into `glossary_refined` (used by
/// the refine stage when no issues were raised).
pub(crate) fn copy_provisional_to_refined_on_conn(conn: &Connection) -> Result<()> {
    clear_glossary_on_conn(conn, GlossaryStage::Refined)?;
    conn.execute(
        "INSERT INTO glossary_refined (term_name, definition, confidence, occurrences, created_at)
         SELECT term_name, definition, confidence, occurrences, created_at FROM glossary_provisional",
        [],
    )?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlossaryIssue {
    pub id: i64,
    pub term_name: String,
    pub issue_type: IssueType,
    pub description: String,
    pub should_exclude: bool,
    pub exclusion_reason: Option<String>,
}

pub(crate) fn clear_issues_on_conn(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM glossary_issues", [])?;
    Ok(())
}

pub(crate) fn insert_issue_on_conn(conn: &Connection, issue: &GlossaryIssue) -> Result<()> {
    conn.execute(
        "INSERT INTO glossary_issues
            (term_name, issue_type, description, should_exclude, exclusion_reason, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            issue.term_name,
            issue.issue_type.as_str(),
            issue.description,
            issue.should_exclude as i64,
            issue.exclusion_reason,
            format_datetime(&now_utc()),
        ],
    )?;
    Ok(())
}

pub(crate) fn list_issues_on_conn(conn: &Connection) -> Result<Vec<GlossaryIssue>> {
    let mut stmt = conn.prepare(
        "SELECT id, term_name, issue_type, description, should_exclude, exclusion_reason
         FROM glossary_issues ORDER BY term_name",
    )?;
    let rows = stmt.query_map([], |row| {
        let issue_type: String = row.get(2)?;
        Ok(GlossaryIssue {
            id: row.get(0)?,
            term_name: row.get(1)?,
            issue_type: issue_type.parse().unwrap_or(IssueType::Unclear),
            description: row.get(3)?,
            should_exclude: row.get::<_, i64>(4)? != 0,
            exclusion_reason: row.get(5)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Clears and reinserts every row of `stage` in one transaction -- the
/// clear-then-insert pattern the Generate/Refine stages need so a reader
/// never observes a half-replaced glossary table.
pub(crate) fn replace_glossary_on_conn(
    conn: &Connection,
    stage: GlossaryStage,
    entries: &[GlossaryEntry],
) -> Result<()> {
    crate::sqlite::transaction::transaction(conn, |c| {
        clear_glossary_on_conn(c, stage)?;
        for entry in entries {
            insert_glossary_entry_on_conn(
                c,
                stage,
                &entry.term_name,
                &entry.definition,
                entry.confidence,
                &entry.occurrences,
            )?;
        }
        Ok(())
    })
}

/// Clears and reinserts the full issue set in one transaction -- the Review
/// stage writes after all batches have been processed, never incrementally.
pub(crate) fn replace_issues_on_conn(conn: &Connection, issues: &[GlossaryIssue]) -> Result<()> {
    crate::sqlite::transaction::transaction(conn, |c| {
        clear_issues_on_conn(c)?;
        for issue in issues {
            insert_issue_on_conn(c, issue)?;
        }
        Ok(())
    })
}

impl SqliteStore {
    pub fn clear_glossary(&self, stage: GlossaryStage) -> Result<()> {
        clear_glossary_on_conn(&self.lock_conn()?, stage)
    }

    /// See [`replace_glossary_on_conn`].
    pub fn replace_glossary(&self, stage: GlossaryStage, entries: &[GlossaryEntry]) -> Result<()> {
        replace_glossary_on_conn(&self.lock_conn()?, stage, entries)
    }

    /// See [`replace_issues_on_conn`].
    pub fn replace_glossary_issues(&self, issues: &[GlossaryIssue]) -> Result<()> {
        replace_issues_on_conn(&self.lock_conn()?, issues)
    }

    pub fn insert_glossary_entry(
        &self,
        stage: GlossaryStage,
        term_name: &str,
        definition: &str,
        confidence: f64,
        occurrences: &[Occurrence],
    ) -> Result<()> {
        insert_glossary_entry_on_conn(&self.lock_conn()?, stage, term_name, definition, confidence, occurrences)
    }

    pub fn list_glossary(&self, stage: GlossaryStage) -> Result<Vec<GlossaryEntry>> {
        list_glossary_on_conn(&self.lock_conn()?, stage)
    }

    pub fn copy_provisional_to_refined(&self) -> Result<()> {
        copy_provisional_to_refined_on_conn(&self.lock_conn()?)
    }

    pub fn clear_glossary_issues(&self) -> Result<()> {
        clear_issues_on_conn(&self.lock_conn()?)
    }

    pub fn insert_glossary_issue(&self, issue: &GlossaryIssue) -> Result<()> {
        insert_issue_on_conn(&self.lock_conn()?, issue)
    }

    pub fn list_glossary_issues(&self) -> Result<Vec<GlossaryIssue>> {
        list_issues_on_conn(&self.lock_conn()?)
    }
}
