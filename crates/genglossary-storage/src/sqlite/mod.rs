//! SQLite-backed storage implementation.

mod batch;
mod documents;
mod glossary;
mod metadata;
mod registry;
mod runs;
pub mod schema;
mod store;
mod synonyms;
mod terms;
pub mod transaction;

pub use batch::batch_insert;
pub use documents::Document;
pub use glossary::{GlossaryEntry, GlossaryIssue, GlossaryStage, Occurrence};
pub use metadata::ProjectMetadata;
pub use registry::{ProjectRecord, RegistryStore};
pub use runs::{Run, UpdateOutcome};
pub use store::SqliteStore;
pub use synonyms::SynonymGroup;
pub use terms::{ExtractedTerm, ListedTerm, TermOverride};
