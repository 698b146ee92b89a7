//! Clap CLI definitions for the `genglossary` command.
//!
//! This module defines the complete CLI structure using clap 4 derive
//! macros: a project registry surface, document ingestion, run lifecycle
//! control, term overrides, and glossary reads/exports.

use clap::{Args, Parser, Subcommand};

/// genglossary -- glossary generation pipeline for a document set.
#[derive(Parser, Debug)]
#[command(
    name = "genglossary",
    about = "Generate and refine a project glossary from a document set",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global flags available to all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Data directory override (default: $GENGLOSSARY_DATA_DIR or ~/.genglossary).
    #[arg(long, global = true, env = "GENGLOSSARY_DATA_DIR")]
    pub data_dir: Option<String>,

    /// Output in JSON format.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose/debug logging.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Actor name recorded as `triggered_by` on runs this invocation starts.
    /// Defaults to `GENGLOSSARY_ACTOR`, then `git config user.name`, then
    /// `$USER`/`$USERNAME`, then `"unknown"`.
    #[arg(long, global = true)]
    pub actor: Option<String>,
}

/// All available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage the project registry.
    Project(ProjectArgs),

    /// Manage a project's source documents.
    Doc(DocArgs),

    /// Manage a project's extracted/excluded/required terms.
    Term(TermArgs),

    /// Start, cancel, and watch pipeline runs.
    Run(RunArgs),

    /// Read and export the generated glossary.
    Glossary(GlossaryArgs),

    /// Generate shell completion scripts.
    Completion(CompletionArgs),

    /// Inspect or update the layered configuration file.
    Config(ConfigArgs),
}

// ===== project =====

#[derive(Args, Debug)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub command: ProjectCommand,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// List all registered projects.
    List,

    /// Register a new project.
    Create(CreateProjectArgs),

    /// Show a single project's registry record.
    Show(ProjectRef),

    /// Remove a project from the registry.
    Delete(DeleteProjectArgs),

    /// Clone a project's settings into a new, empty project.
    Clone(CloneProjectArgs),
}

#[derive(Args, Debug)]
pub struct CreateProjectArgs {
    /// Unique project name.
    pub name: String,

    /// Directory to load documents from at run time.
    #[arg(long)]
    pub doc_root: Option<String>,

    /// LLM adapter: `ollama` or `openai_compatible`.
    #[arg(long, default_value = "ollama")]
    pub llm_provider: String,

    /// Model identifier passed to the adapter.
    #[arg(long, default_value = "llama3")]
    pub llm_model: String,

    /// Base URL of the LLM server (defaults per-provider if omitted).
    #[arg(long)]
    pub llm_base_url: Option<String>,
}

#[derive(Args, Debug)]
pub struct ProjectRef {
    /// Project id or name.
    pub project: String,
}

#[derive(Args, Debug)]
pub struct DeleteProjectArgs {
    /// Project id or name.
    pub project: String,

    /// Also delete the project's database file on disk.
    #[arg(long)]
    pub remove_db: bool,
}

#[derive(Args, Debug)]
pub struct CloneProjectArgs {
    /// Project id or name to clone.
    pub project: String,

    /// Name for the new project.
    #[arg(long)]
    pub name: String,
}

// ===== doc =====

#[derive(Args, Debug)]
pub struct DocArgs {
    #[command(subcommand)]
    pub command: DocCommand,
}

#[derive(Subcommand, Debug)]
pub enum DocCommand {
    /// List documents already loaded into a project's database.
    List(ProjectRef),

    /// Load a single file's content directly into a project's database.
    Add(AddDocArgs),
}

#[derive(Args, Debug)]
pub struct AddDocArgs {
    /// Project id or name.
    pub project: String,

    /// Path to the file to load.
    pub file: String,
}

// ===== term =====

#[derive(Args, Debug)]
pub struct TermArgs {
    #[command(subcommand)]
    pub command: TermCommand,
}

#[derive(Subcommand, Debug)]
pub enum TermCommand {
    /// Show the unified term listing (extracted, minus excluded, plus required).
    List(ProjectRef),

    /// Exclude a term from the glossary.
    Exclude(TermOverrideArgs),

    /// Force a term into the glossary even if excluded or never extracted.
    Require(TermOverrideArgs),
}

#[derive(Args, Debug)]
pub struct TermOverrideArgs {
    /// Project id or name.
    pub project: String,

    /// The term text to override.
    pub term: String,

    /// Who/what recorded this override: `manual` or `auto`.
    #[arg(long, default_value = "manual")]
    pub source: String,
}

// ===== run =====

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(subcommand)]
    pub command: RunCommand,
}

#[derive(Subcommand, Debug)]
pub enum RunCommand {
    /// Start a run and stream its log events until it finishes.
    Start(StartRunArgs),

    /// Request cancellation of a run.
    Cancel(CancelRunArgs),

    /// Show the current (or most recent) run's status.
    Status(ProjectRef),

    /// List all runs recorded for a project.
    List(ProjectRef),

    /// Watch a run's progress by polling its database row.
    Logs(LogsRunArgs),
}

#[derive(Args, Debug)]
pub struct StartRunArgs {
    /// Project id or name.
    pub project: String,

    /// Which stages to run: `full`, `extract`, `generate`, `review`, or `refine`.
    #[arg(long, default_value = "full")]
    pub scope: String,

    /// Who triggered the run, recorded on the run row. Defaults to the
    /// resolved actor (see `--actor`).
    #[arg(long)]
    pub triggered_by: Option<String>,

    /// Start the run and return immediately instead of streaming logs.
    #[arg(long)]
    pub detach: bool,
}

#[derive(Args, Debug)]
pub struct CancelRunArgs {
    /// Project id or name.
    pub project: String,

    /// Run id to cancel.
    pub run_id: i64,
}

#[derive(Args, Debug)]
pub struct LogsRunArgs {
    /// Project id or name.
    pub project: String,

    /// Run id to watch.
    pub run_id: i64,

    /// Keep polling until the run reaches a terminal status. Without this
    /// flag, prints one snapshot and exits.
    #[arg(long)]
    pub follow: bool,
}

// ===== glossary =====

#[derive(Args, Debug)]
pub struct GlossaryArgs {
    #[command(subcommand)]
    pub command: GlossaryCommand,
}

#[derive(Subcommand, Debug)]
pub enum GlossaryCommand {
    /// Show glossary entries.
    Show(GlossaryShowArgs),

    /// List unresolved review issues.
    Issues(ProjectRef),

    /// Render the glossary as a Markdown document.
    Export(GlossaryExportArgs),
}

#[derive(Args, Debug)]
pub struct GlossaryShowArgs {
    /// Project id or name.
    pub project: String,

    /// Which stage to read: `provisional` or `refined`.
    #[arg(long, default_value = "refined")]
    pub stage: String,
}

#[derive(Args, Debug)]
pub struct GlossaryExportArgs {
    /// Project id or name.
    pub project: String,

    /// Which stage to read: `provisional` or `refined`.
    #[arg(long, default_value = "refined")]
    pub stage: String,

    /// Write to this path instead of stdout.
    #[arg(long)]
    pub out: Option<String>,
}

// ===== completion =====

#[derive(Args, Debug)]
pub struct CompletionArgs {
    /// Shell to generate a completion script for.
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

// ===== config =====

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration (defaults, file, env merged).
    Show,

    /// Set a key in `config.yaml` and persist it.
    ///
    /// Supported keys: `llm.provider`, `llm.model`, `llm.base_url`,
    /// `llm.timeout_secs`, `actor`, `log_level`, `json`.
    Set(ConfigSetArgs),
}

#[derive(Args, Debug)]
pub struct ConfigSetArgs {
    /// Dotted key to set.
    pub key: String,

    /// New value.
    pub value: String,
}
