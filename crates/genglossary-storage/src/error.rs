//! Storage error types.

use genglossary_core::validation::ValidationError;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested entity was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "run", "document").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// A uniqueness or foreign-key constraint was violated.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// The project already has a non-terminal run; a new one cannot start.
    #[error("a run is already active for this project")]
    AlreadyRunning,

    /// The database has not been initialized.
    #[error("database not initialized: {reason}")]
    NotInitialized {
        /// Why the database is considered uninitialized.
        reason: String,
    },

    /// A caller-supplied value failed validation before it reached SQL.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The database is locked by another process/thread.
    #[error("database locked: {0}")]
    DatabaseLocked(String),

    /// Failed to establish or maintain a database connection.
    #[error("connection error: {0}")]
    Connection(String),

    /// A transaction or savepoint operation failed.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Calling `immediate_transaction` while already inside a transaction.
    #[error("immediate_transaction does not support nesting")]
    ImmediateTransactionNested,

    /// A schema migration failed.
    #[error("migration {name} failed: {reason}")]
    Migration {
        /// Name of the migration that failed.
        name: String,
        /// Underlying error description.
        reason: String,
    },

    /// A table name passed to a generic/batch helper was not on the whitelist.
    #[error("table {0:?} is not a recognized batch-insert target")]
    UnknownTable(String),

    /// A raw SQLite query error.
    #[error("query error: {0}")]
    Query(#[from] rusqlite::Error),

    /// JSON serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Catch-all for unexpected internal errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the storage crate.
pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    /// Creates a [`StorageError::NotFound`] for the given entity kind and id.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Returns `true` if this is a [`StorageError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if the error is transient and the operation may succeed
    /// on retry (e.g. database locked, connection errors).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DatabaseLocked(_) | Self::Connection(_) | Self::Transaction(_)
        )
    }

    /// Maps a `rusqlite` constraint-violation error into [`StorageError::ConstraintViolation`],
    /// leaving other rusqlite errors as [`StorageError::Query`].
    pub fn from_rusqlite_insert(err: rusqlite::Error, context: &str) -> Self {
        if let rusqlite::Error::SqliteFailure(ref sqlite_err, _) = err {
            if sqlite_err.code == rusqlite::ErrorCode::ConstraintViolation {
                return Self::ConstraintViolation(format!("{context}: {err}"));
            }
        }
        Self::Query(err)
    }
}
