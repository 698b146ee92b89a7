//! Synonym groups: `term_synonym_groups` and `term_synonym_members`.
//!
//! A term belongs to at most one group (enforced by the UNIQUE constraint on
//! `term_synonym_members.term_text`). The primary term is written as a
//! member in the same transaction it is created in, so "primary is also a
//! member" never depends on a trigger.

use rusqlite::{params, Connection};
use serde::Serialize;

use genglossary_core::time::{format_datetime, now_utc};

use crate::error::Result;
use crate::sqlite::store::SqliteStore;
use crate::sqlite::transaction::transaction;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynonymGroup {
    pub id: i64,
    pub primary_term_text: String,
    pub members: Vec<String>,
}

pub(crate) fn create_group_on_conn(
    conn: &Connection,
    primary_term_text: &str,
    other_members: &[String],
) -> Result<i64> {
    transaction(conn, |conn| {
        conn.execute(
            "INSERT INTO term_synonym_groups (primary_term_text, created_at) VALUES (?1, ?2)",
            params![primary_term_text, format_datetime(&now_utc())],
        )?;
        let group_id = conn.last_insert_rowid();

        conn.execute(
            "INSERT INTO term_synonym_members (group_id, term_text) VALUES (?1, ?2)",
            params![group_id, primary_term_text],
        )?;
        for member in other_members {
            if member == primary_term_text {
                continue;
            }
            conn.execute(
                "INSERT INTO term_synonym_members (group_id, term_text) VALUES (?1, ?2)",
                params![group_id, member],
            )?;
        }
        Ok(group_id)
    })
}

pub(crate) fn list_groups_on_conn(conn: &Connection) -> Result<Vec<SynonymGroup>> {
    let mut stmt = conn.prepare("SELECT id, primary_term_text FROM term_synonym_groups ORDER BY id")?;
    let groups = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut out = Vec::with_capacity(groups.len());
    for (id, primary_term_text) in groups {
        let mut members_stmt = conn.prepare(
            "SELECT term_text FROM term_synonym_members WHERE group_id = ?1 ORDER BY term_text",
        )?;
        let members = members_stmt
            .query_map(params![id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        out.push(SynonymGroup { id, primary_term_text, members });
    }
    Ok(out)
}

pub(crate) fn find_group_for_term_on_conn(conn: &Connection, term_text: &str) -> Result<Option<SynonymGroup>> {
    let group_id: Option<i64> = conn
        .query_row(
            "SELECT group_id FROM term_synonym_members WHERE term_text = ?1",
            params![term_text],
            |row| row.get(0),
        )
        .ok();
    let Some(group_id) = group_id else { return Ok(None) };

    let primary_term_text: String = conn.query_row(
        "SELECT primary_term_text FROM term_synonym_groups WHERE id = ?1",
        params![group_id],
        |row| row.get(0),
    )?;
    let mut members_stmt = conn.prepare(
        "SELECT term_text FROM term_synonym_members WHERE group_id = ?1 ORDER BY term_text",
    )?;
    let members = members_stmt
        .query_map(params![group_id], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(Some(SynonymGroup { id: group_id, primary_term_text, members }))
}

impl SqliteStore {
    pub fn create_synonym_group(&self, primary_term_text: &str, other_members: &[String]) -> Result<i64> {
        create_group_on_conn(&self.lock_conn()?, primary_term_text, other_members)
    }

    pub fn list_synonym_groups(&self) -> Result<Vec<SynonymGroup>> {
        list_groups_on_conn(&self.lock_conn()?)
    }

    pub fn find_synonym_group_for_term(&self, term_text: &str) -> Result<Option<SynonymGroup>> {
        find_group_for_term_on_conn(&self.lock_conn()?, term_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_is_included_as_a_member() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_synonym_group("widget", &["gadget".to_string(), "gizmo".to_string()]).unwrap();

        let groups = store.list_synonym_groups().unwrap();
        assert_eq!(groups.len(), 1);
        assert!(groups[0].members.contains(&"widget".to_string()));
        assert_eq!(groups[0].members.len(), 3);
    }

    #[test]
    fn find_group_by_non_primary_member() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_synonym_group("widget", &["gadget".to_string()]).unwrap();

        let group = store.find_synonym_group_for_term("gadget").unwrap().unwrap();
        assert_eq!(group.primary_term_text, "widget");
    }

    #[test]
    fn term_belongs_to_at_most_one_group() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_synonym_group("widget", &["gadget".to_string()]).unwrap();
        let result = store.create_synonym_group("thingamajig", &["gadget".to_string()]);
        assert!(result.is_err());
    }
}
