//! DDL statements and migrations for the project database schema.
//!
//! Timestamps are stored as TEXT in ISO 8601 format (SQLite has no native
//! datetime type). Booleans are stored as INTEGER (0/1). JSON blobs are TEXT.

/// Current schema version. Bumped whenever DDL or migrations change.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Core DDL statements executed during `init_schema`.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    // -- Bookkeeping (schema version, applied migrations) --------------------
    r#"
    CREATE TABLE IF NOT EXISTS schema_state (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
    // -- Project metadata (single row, id = 1) --------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS metadata (
        id            INTEGER PRIMARY KEY CHECK (id = 1),
        input_path    TEXT,
        llm_provider  TEXT NOT NULL DEFAULT 'ollama',
        llm_model     TEXT NOT NULL DEFAULT 'llama3',
        llm_base_url  TEXT,
        updated_at    TEXT NOT NULL
    )
    "#,
    // -- Documents -------------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        file_name    TEXT NOT NULL UNIQUE,
        content      TEXT NOT NULL,
        content_hash TEXT NOT NULL,
        created_at   TEXT NOT NULL,
        updated_at   TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_documents_file_name ON documents(file_name)",
    // -- Term extraction/classification state ----------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS terms_extracted (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        term_text  TEXT NOT NULL UNIQUE,
        category   TEXT,
        user_notes TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS terms_excluded (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        term_text  TEXT NOT NULL UNIQUE,
        source     TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS terms_required (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        term_text  TEXT NOT NULL UNIQUE,
        source     TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    // -- Glossary tables ---------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS glossary_provisional (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        term_name   TEXT NOT NULL UNIQUE,
        definition  TEXT NOT NULL,
        confidence  REAL NOT NULL DEFAULT 0.0,
        occurrences TEXT NOT NULL DEFAULT '[]',
        created_at  TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS glossary_refined (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        term_name   TEXT NOT NULL UNIQUE,
        definition  TEXT NOT NULL,
        confidence  REAL NOT NULL DEFAULT 0.0,
        occurrences TEXT NOT NULL DEFAULT '[]',
        created_at  TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS glossary_issues (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        term_name        TEXT NOT NULL,
        issue_type       TEXT NOT NULL,
        description      TEXT NOT NULL,
        should_exclude   INTEGER NOT NULL DEFAULT 0,
        exclusion_reason TEXT,
        created_at       TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_glossary_issues_term ON glossary_issues(term_name)",
    // -- Synonym groups ----------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS term_synonym_groups (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        primary_term_text TEXT NOT NULL,
        created_at        TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS term_synonym_members (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        group_id  INTEGER NOT NULL REFERENCES term_synonym_groups(id) ON DELETE CASCADE,
        term_text TEXT NOT NULL UNIQUE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_synonym_members_group ON term_synonym_members(group_id)",
    // -- Runs ----------------------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS runs (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        scope            TEXT NOT NULL,
        status           TEXT NOT NULL,
        started_at       TEXT,
        finished_at      TEXT,
        triggered_by     TEXT NOT NULL,
        error_message    TEXT,
        progress_current INTEGER NOT NULL DEFAULT 0,
        progress_total   INTEGER NOT NULL DEFAULT 0,
        current_step     TEXT,
        created_at       TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_runs_status ON runs(status)",
    "CREATE INDEX IF NOT EXISTS idx_runs_created_at ON runs(created_at)",
];

/// Schema migrations applied after initial DDL.
///
/// Each migration is a `(name, sql)` pair, tracked in `schema_state` under
/// the key `migration:<name>` so it runs at most once.
pub const MIGRATIONS: &[(&str, &str)] = &[
    // Future migrations go here, e.g.:
    // ("001_add_runs_worker_id", "ALTER TABLE runs ADD COLUMN worker_id TEXT"),
];
