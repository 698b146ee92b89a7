//! Run lifecycle records, with guarded status transitions.
//!
//! `update_status` is unrestricted. The three guarded helpers
//! (`update_if_active`, `update_if_running`, `complete_if_not_cancelled`,
//! `fail_if_not_terminal`) are the only way the Run Manager's finalizer is
//! allowed to move a row into a terminal state, so a late cancel racing a
//! finalizer can never be silently overwritten.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use genglossary_core::enums::{RunScope, RunStatus};
use genglossary_core::time::{format_datetime, now_utc};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Run {
    pub id: i64,
    pub scope: RunScope,
    pub status: RunStatus,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub triggered_by: String,
    pub error_message: Option<String>,
    pub progress_current: i64,
    pub progress_total: i64,
    pub current_step: Option<String>,
    pub created_at: String,
}

/// Outcome of a guarded update: how many rows matched the pre-state guard.
/// `NoMatch` means the row was already terminal (or absent) -- a no-op the
/// caller should log rather than treat as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    NoMatch,
}

impl UpdateOutcome {
    fn from_rows_affected(n: usize) -> Self {
        if n > 0 {
            UpdateOutcome::Updated
        } else {
            UpdateOutcome::NoMatch
        }
    }
}

fn scan_run(row: &rusqlite::Row) -> rusqlite::Result<Run> {
    let scope: String = row.get("scope")?;
    let status: String = row.get("status")?;
    Ok(Run {
        id: row.get("id")?,
        scope: scope.parse().unwrap_or(RunScope::Full),
        status: status.parse().unwrap_or(RunStatus::Pending),
        started_at: row.get("started_at")?,
        finished_at: row.get("finished_at")?,
        triggered_by: row.get("triggered_by")?,
        error_message: row.get("error_message")?,
        progress_current: row.get("progress_current")?,
        progress_total: row.get("progress_total")?,
        current_step: row.get("current_step")?,
        created_at: row.get("created_at")?,
    })
}

const RUN_COLUMNS: &str = "id, scope, status, started_at, finished_at, triggered_by, \
     error_message, progress_current, progress_total, current_step, created_at";

/// Inserts a new `pending` run. Caller is expected to have already checked
/// (within the same IMMEDIATE transaction) that no active run exists.
pub(crate) fn insert_pending_on_conn(conn: &Connection, scope: RunScope, triggered_by: &str) -> Result<Run> {
    let now = format_datetime(&now_utc());
    conn.execute(
        "INSERT INTO runs (scope, status, triggered_by, progress_current, progress_total, created_at)
         VALUES (?1, 'pending', ?2, 0, 0, ?3)",
        params![scope.as_str(), triggered_by, now],
    )?;
    let id = conn.last_insert_rowid();
    get_run_on_conn(conn, id)?.ok_or_else(|| {
        crate::error::StorageError::Internal(format!("run {id} vanished immediately after insert"))
    })
}

pub(crate) fn get_run_on_conn(conn: &Connection, id: i64) -> Result<Option<Run>> {
    conn.query_row(
        &format!("SELECT {RUN_COLUMNS} FROM runs WHERE id = ?1"),
        params![id],
        scan_run,
    )
    .optional()
    .map_err(Into::into)
}

pub(crate) fn list_runs_on_conn(conn: &Connection) -> Result<Vec<Run>> {
    let mut stmt = conn.prepare(&format!("SELECT {RUN_COLUMNS} FROM runs ORDER BY created_at DESC"))?;
    let rows = stmt.query_map([], scan_run)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Returns the single non-terminal run, if any. Relied on by the Run
/// Manager's start path inside an IMMEDIATE transaction.
pub(crate) fn find_active_run_on_conn(conn: &Connection) -> Result<Option<Run>> {
    conn.query_row(
        &format!(
            "SELECT {RUN_COLUMNS} FROM runs WHERE status IN ('pending', 'running') \
             ORDER BY created_at DESC LIMIT 1"
        ),
        [],
        scan_run,
    )
    .optional()
    .map_err(Into::into)
}

/// The active run if one exists, else the most recently created row
/// regardless of status.
pub(crate) fn get_current_or_latest_on_conn(conn: &Connection) -> Result<Option<Run>> {
    if let Some(run) = find_active_run_on_conn(conn)? {
        return Ok(Some(run));
    }
    conn.query_row(
        &format!("SELECT {RUN_COLUMNS} FROM runs ORDER BY created_at DESC LIMIT 1"),
        [],
        scan_run,
    )
    .optional()
    .map_err(Into::into)
}

/// Unrestricted status setter. Clears `error_message` whenever the target
/// status is non-terminal, so a requeue never carries a stale error forward.
pub(crate) fn update_status_on_conn(
    conn: &Connection,
    id: i64,
    status: RunStatus,
    started_at: Option<&str>,
    finished_at: Option<&str>,
    error_message: Option<&str>,
) -> Result<UpdateOutcome> {
    let clear_error = !status.is_terminal();
    let n = conn.execute(
        "UPDATE runs SET status = ?1,
            started_at = COALESCE(?2, started_at),
            finished_at = COALESCE(?3, finished_at),
            error_message = CASE WHEN ?4 THEN NULL ELSE COALESCE(?5, error_message) END
         WHERE id = ?6",
        params![status.as_str(), started_at, finished_at, clear_error, error_message, id],
    )?;
    Ok(UpdateOutcome::from_rows_affected(n))
}

pub(crate) fn transition_to_running_on_conn(conn: &Connection, id: i64) -> Result<UpdateOutcome> {
    let now = format_datetime(&now_utc());
    let n = conn.execute(
        "UPDATE runs SET status = 'running', started_at = ?1 WHERE id = ?2 AND status = 'pending'",
        params![now, id],
    )?;
    Ok(UpdateOutcome::from_rows_affected(n))
}

/// Guarded: only rows currently `pending`/`running` move, and only to a
/// terminal status. Sets `finished_at` to `now` unless the caller supplies
/// one explicitly.
pub(crate) fn update_if_active_on_conn(
    conn: &Connection,
    id: i64,
    target: RunStatus,
    finished_at: Option<&str>,
    error_message: Option<&str>,
) -> Result<UpdateOutcome> {
    debug_assert!(target.is_terminal(), "update_if_active only targets terminal states");
    let finished_at = finished_at
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| format_datetime(&now_utc()));
    let n = conn.execute(
        "UPDATE runs SET status = ?1, finished_at = ?2, error_message = ?3
         WHERE id = ?4 AND status IN ('pending', 'running')",
        params![target.as_str(), finished_at, error_message, id],
    )?;
    Ok(UpdateOutcome::from_rows_affected(n))
}

/// Guarded: only rows currently `running` move, and only to a terminal status.
pub(crate) fn update_if_running_on_conn(
    conn: &Connection,
    id: i64,
    target: RunStatus,
    error_message: Option<&str>,
) -> Result<UpdateOutcome> {
    debug_assert!(target.is_terminal(), "update_if_running only targets terminal states");
    let finished_at = format_datetime(&now_utc());
    let n = conn.execute(
        "UPDATE runs SET status = ?1, finished_at = ?2, error_message = ?3
         WHERE id = ?4 AND status = 'running'",
        params![target.as_str(), finished_at, error_message, id],
    )?;
    Ok(UpdateOutcome::from_rows_affected(n))
}

pub(crate) fn cancel_on_conn(conn: &Connection, id: i64) -> Result<UpdateOutcome> {
    update_if_active_on_conn(conn, id, RunStatus::Cancelled, None, None)
}

/// `running -> completed` only. A late cancel that already moved the row to
/// `cancelled` makes this a no-op (`NoMatch`), which is the point: the
/// caller treats the run as completed without clobbering the cancellation.
pub(crate) fn complete_if_not_cancelled_on_conn(conn: &Connection, id: i64) -> Result<UpdateOutcome> {
    update_if_running_on_conn(conn, id, RunStatus::Completed, None)
}

pub(crate) fn fail_if_not_terminal_on_conn(
    conn: &Connection,
    id: i64,
    error_message: &str,
) -> Result<UpdateOutcome> {
    update_if_active_on_conn(conn, id, RunStatus::Failed, None, Some(error_message))
}

pub(crate) fn set_progress_on_conn(
    conn: &Connection,
    id: i64,
    current: i64,
    total: i64,
    step: Option<&str>,
) -> Result<()> {
    conn.execute(
        "UPDATE runs SET progress_current = ?1, progress_total = ?2, current_step = ?3 WHERE id = ?4",
        params![current, total, step, id],
    )?;
    Ok(())
}

/// Atomically checks for an active run and inserts a new `pending` one if
/// none exists, inside a `BEGIN IMMEDIATE` transaction so the check-then-act
/// is safe across processes. The Run Manager's start path relies on this
/// single call to get the guarantee described in the module docs.
pub(crate) fn start_run_if_not_active_on_conn(
    conn: &Connection,
    scope: RunScope,
    triggered_by: &str,
) -> Result<Run> {
    crate::sqlite::transaction::immediate_transaction(conn, |c| {
        if find_active_run_on_conn(c)?.is_some() {
            return Err(crate::error::StorageError::AlreadyRunning);
        }
        insert_pending_on_conn(c, scope, triggered_by)
    })
}

impl super::SqliteStore {
    pub fn insert_pending_run(&self, scope: RunScope, triggered_by: &str) -> Result<Run> {
        insert_pending_on_conn(&self.lock_conn()?, scope, triggered_by)
    }

    /// See [`start_run_if_not_active_on_conn`].
    pub fn start_run_if_not_active(&self, scope: RunScope, triggered_by: &str) -> Result<Run> {
        start_run_if_not_active_on_conn(&self.lock_conn()?, scope, triggered_by)
    }

    pub fn get_run(&self, id: i64) -> Result<Option<Run>> {
        get_run_on_conn(&self.lock_conn()?, id)
    }

    pub fn list_runs(&self) -> Result<Vec<Run>> {
        list_runs_on_conn(&self.lock_conn()?)
    }

    pub fn find_active_run(&self) -> Result<Option<Run>> {
        find_active_run_on_conn(&self.lock_conn()?)
    }

    pub fn get_current_or_latest_run(&self) -> Result<Option<Run>> {
        get_current_or_latest_on_conn(&self.lock_conn()?)
    }

    pub fn update_run_status(
        &self,
        id: i64,
        status: RunStatus,
        started_at: Option<&str>,
        finished_at: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<UpdateOutcome> {
        update_status_on_conn(&self.lock_conn()?, id, status, started_at, finished_at, error_message)
    }

    pub fn transition_run_to_running(&self, id: i64) -> Result<UpdateOutcome> {
        transition_to_running_on_conn(&self.lock_conn()?, id)
    }

    pub fn update_run_if_active(
        &self,
        id: i64,
        target: RunStatus,
        error_message: Option<&str>,
    ) -> Result<UpdateOutcome> {
        update_if_active_on_conn(&self.lock_conn()?, id, target, None, error_message)
    }

    pub fn cancel_run(&self, id: i64) -> Result<UpdateOutcome> {
        cancel_on_conn(&self.lock_conn()?, id)
    }

    pub fn complete_run_if_not_cancelled(&self, id: i64) -> Result<UpdateOutcome> {
        complete_if_not_cancelled_on_conn(&self.lock_conn()?, id)
    }

    pub fn fail_run_if_not_terminal(&self, id: i64, error_message: &str) -> Result<UpdateOutcome> {
        fail_if_not_terminal_on_conn(&self.lock_conn()?, id, error_message)
    }

    pub fn set_run_progress(&self, id: i64, current: i64, total: i64, step: Option<&str>) -> Result<()> {
        set_progress_on_conn(&self.lock_conn()?, id, current, total, step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::SqliteStore;

    #[test]
    fn insert_then_transition_lifecycle() {
        let store = SqliteStore::open_in_memory().unwrap();
        let run = store.insert_pending_run(RunScope::Full, "alice").unwrap();
        assert_eq!(run.status, RunStatus::Pending);

        assert_eq!(store.transition_run_to_running(run.id).unwrap(), UpdateOutcome::Updated);
        let run = store.get_run(run.id).unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.started_at.is_some());

        assert_eq!(store.complete_run_if_not_cancelled(run.id).unwrap(), UpdateOutcome::Updated);
        let run = store.get_run(run.id).unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn pending_cannot_complete_directly() {
        let store = SqliteStore::open_in_memory().unwrap();
        let run = store.insert_pending_run(RunScope::Generate, "bob").unwrap();
        // complete_if_not_cancelled only matches `running`; pending is a no-op.
        assert_eq!(store.complete_run_if_not_cancelled(run.id).unwrap(), UpdateOutcome::NoMatch);
        let run = store.get_run(run.id).unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Pending);
    }

    #[test]
    fn late_cancel_after_completion_is_a_no_op() {
        let store = SqliteStore::open_in_memory().unwrap();
        let run = store.insert_pending_run(RunScope::Full, "alice").unwrap();
        store.transition_run_to_running(run.id).unwrap();
        store.complete_run_if_not_cancelled(run.id).unwrap();

        // A cancel racing in after completion must not clobber `completed`.
        let outcome = store.cancel_run(run.id).unwrap();
        assert_eq!(outcome, UpdateOutcome::NoMatch);
        let run = store.get_run(run.id).unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Completed);
    }

    #[test]
    fn fail_does_not_overwrite_cancelled() {
        let store = SqliteStore::open_in_memory().unwrap();
        let run = store.insert_pending_run(RunScope::Full, "alice").unwrap();
        store.transition_run_to_running(run.id).unwrap();
        store.cancel_run(run.id).unwrap();

        let outcome = store.fail_run_if_not_terminal(run.id, "boom").unwrap();
        assert_eq!(outcome, UpdateOutcome::NoMatch);
        let run = store.get_run(run.id).unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Cancelled);
    }

    #[test]
    fn update_status_to_non_terminal_clears_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        let run = store.insert_pending_run(RunScope::Full, "alice").unwrap();
        store.transition_run_to_running(run.id).unwrap();
        store.fail_run_if_not_terminal(run.id, "boom").unwrap();

        store.update_run_status(run.id, RunStatus::Pending, None, None, None).unwrap();
        let run = store.get_run(run.id).unwrap().unwrap();
        assert!(run.error_message.is_none());
    }

    #[test]
    fn start_run_if_not_active_rejects_second_run() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.start_run_if_not_active(RunScope::Full, "alice").unwrap();

        let result = store.start_run_if_not_active(RunScope::Extract, "bob");
        assert!(matches!(result, Err(crate::error::StorageError::AlreadyRunning)));
    }

    #[test]
    fn start_run_if_not_active_allows_after_completion() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = store.start_run_if_not_active(RunScope::Full, "alice").unwrap();
        store.transition_run_to_running(first.id).unwrap();
        store.complete_run_if_not_cancelled(first.id).unwrap();

        let second = store.start_run_if_not_active(RunScope::Generate, "bob").unwrap();
        assert_ne!(second.id, first.id);
    }

    #[test]
    fn current_or_latest_falls_back_to_most_recent_after_finish() {
        let store = SqliteStore::open_in_memory().unwrap();
        let run = store.insert_pending_run(RunScope::Full, "alice").unwrap();
        store.transition_run_to_running(run.id).unwrap();
        store.complete_run_if_not_cancelled(run.id).unwrap();

        let current = store.get_current_or_latest_run().unwrap().unwrap();
        assert_eq!(current.id, run.id);
        assert_eq!(current.status, RunStatus::Completed);
    }
}
