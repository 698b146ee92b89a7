//! Nested-transaction and write-locking primitives.
//!
//! `transaction` supports arbitrary nesting: the outermost call opens a real
//! `BEGIN`/`COMMIT`, every nested call opens a SAVEPOINT instead, so an inner
//! failure can roll back just the inner work while the outer transaction
//! keeps going. `immediate_transaction` is the separate primitive used to
//! acquire SQLite's write lock up front for cross-process check-then-act
//! sequences; it does not nest.

use rand::Rng;
use rusqlite::Connection;

use crate::error::{Result, StorageError};

/// Runs `f` inside a transaction, nesting via a savepoint if one is already
/// open on `conn`.
pub fn transaction<T>(conn: &Connection, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
    if conn.is_autocommit() {
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()
                    .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
                Ok(value)
            }
            Err(e) => {
                // Transaction rolls back on drop regardless of the explicit
                // rollback() call's own result.
                let _ = tx.rollback();
                Err(e)
            }
        }
    } else {
        let name = savepoint_name();
        conn.execute_batch(&format!("SAVEPOINT {name}"))
            .map_err(|e| StorageError::Transaction(format!("failed to open savepoint {name}: {e}")))?;

        match f(conn) {
            Ok(value) => {
                conn.execute_batch(&format!("RELEASE {name}")).map_err(|e| {
                    StorageError::Transaction(format!("failed to release savepoint {name}: {e}"))
                })?;
                Ok(value)
            }
            Err(e) => {
                conn.execute_batch(&format!("ROLLBACK TO {name}; RELEASE {name}"))
                    .map_err(|rollback_err| {
                        StorageError::Transaction(format!(
                            "failed to roll back savepoint {name}: {rollback_err} (original error: {e})"
                        ))
                    })?;
                Err(e)
            }
        }
    }
}

/// Runs `f` inside a `BEGIN IMMEDIATE` transaction, acquiring SQLite's
/// write lock before `f` runs. Does not nest: calling this while already
/// inside a transaction is a programmer error.
pub fn immediate_transaction<T>(
    conn: &Connection,
    f: impl FnOnce(&Connection) -> Result<T>,
) -> Result<T> {
    if !conn.is_autocommit() {
        return Err(StorageError::ImmediateTransactionNested);
    }

    conn.execute_batch("BEGIN IMMEDIATE")
        .map_err(|e| StorageError::DatabaseLocked(e.to_string()))?;

    match f(conn) {
        Ok(value) => {
            conn.execute_batch("COMMIT")
                .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
            Ok(value)
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(e)
        }
    }
}

/// Generates a unique savepoint name: an 8-character alphanumeric suffix
/// so concurrent nested calls on the same connection never collide.
fn savepoint_name() -> String {
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    let suffix: String = (0..8)
        .map(|_| {
            let idx = rng.random_range(0..CHARS.len());
            CHARS[idx] as char
        })
        .collect();
    format!("sp_{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v INTEGER)").unwrap();
        conn
    }

    #[test]
    fn top_level_commit() {
        let conn = conn();
        transaction(&conn, |c| {
            c.execute("INSERT INTO t (v) VALUES (1)", [])?;
            Ok(())
        })
        .unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn top_level_rollback_on_error() {
        let conn = conn();
        let result: Result<()> = transaction(&conn, |c| {
            c.execute("INSERT INTO t (v) VALUES (1)", [])?;
            Err(StorageError::Internal("forced".into()))
        });
        assert!(result.is_err());
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn nested_savepoint_rolls_back_inner_only() {
        let conn = conn();
        transaction(&conn, |c| {
            c.execute("INSERT INTO t (v) VALUES (1)", [])?;

            let inner: Result<()> = transaction(c, |c2| {
                c2.execute("INSERT INTO t (v) VALUES (2)", [])?;
                Err(StorageError::Internal("inner failure".into()))
            });
            assert!(inner.is_err());

            c.execute("INSERT INTO t (v) VALUES (3)", [])?;
            Ok(())
        })
        .unwrap();

        let mut stmt = conn.prepare("SELECT v FROM t ORDER BY v").unwrap();
        let values: Vec<i64> = stmt
            .query_map([], |r| r.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(values, vec![1, 3]);
    }

    #[test]
    fn immediate_transaction_rejects_nesting() {
        let conn = conn();
        let result: Result<()> = transaction(&conn, |c| {
            let inner: Result<()> = immediate_transaction(c, |_| Ok(()));
            assert!(matches!(inner, Err(StorageError::ImmediateTransactionNested)));
            Ok(())
        });
        assert!(result.is_ok());
    }

    #[test]
    fn immediate_transaction_commits() {
        let conn = conn();
        immediate_transaction(&conn, |c| {
            c.execute("INSERT INTO t (v) VALUES (42)", [])?;
            Ok(())
        })
        .unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);
    }
}
