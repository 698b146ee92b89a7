//! Transactional storage layer for the genglossary pipeline engine.
//!
//! Exposes a SQLite-backed [`SqliteStore`] for a single project's data plus
//! a separate [`RegistryStore`] for the process-wide project directory.
//! Every table has its own thin repository module under `sqlite/`; none of
//! them commit or roll back on their own, callers provide the transaction
//! boundary via [`sqlite::transaction::transaction`] /
//! [`sqlite::transaction::immediate_transaction`].

pub mod error;
pub mod sqlite;

pub use error::StorageError;
pub use sqlite::{
    batch_insert, Document, ExtractedTerm, GlossaryEntry, GlossaryIssue, GlossaryStage,
    ListedTerm, Occurrence, ProjectMetadata, ProjectRecord, RegistryStore, Run, SqliteStore,
    SynonymGroup, TermOverride, UpdateOutcome,
};
