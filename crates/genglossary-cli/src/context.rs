//! Runtime context for command execution.
//!
//! The [`RuntimeContext`] holds the state every command handler needs: the
//! resolved data directory, the global output flags, and the resolved
//! actor name. The data directory is a single fixed, user-scoped location
//! resolved once at startup -- there is no per-repository discovery.

use std::env;
use std::path::PathBuf;
use std::process::Command;

use anyhow::Context as _;
use genglossary_config::config::{load_config, AppConfig, ConfigOverrides};
use genglossary_config::data_dir::{config_file_path, ensure_data_dir, registry_db_path, resolve_data_dir};
use genglossary_storage::{ProjectRecord, RegistryStore};

use crate::cli::GlobalArgs;

/// Runtime context passed to every command handler.
///
/// Constructed once in `main` after CLI parsing, before command dispatch.
#[derive(Debug)]
pub struct RuntimeContext {
    /// Resolved data directory, e.g. `~/.genglossary`.
    pub data_dir: PathBuf,

    /// Whether to produce JSON output.
    pub json: bool,

    /// Verbose logging.
    pub verbose: bool,

    /// Resolved actor name, recorded as `triggered_by` on runs this
    /// invocation starts.
    pub actor: String,
}

impl RuntimeContext {
    /// Builds a `RuntimeContext` from parsed global arguments.
    ///
    /// Layers configuration lowest to highest priority: built-in defaults,
    /// `config.yaml` under the data directory, `GENGLOSSARY_*` env vars,
    /// then these CLI flags. Fails if no data directory override was given
    /// anywhere in that chain and the home directory cannot be determined.
    pub fn from_global_args(global: &GlobalArgs) -> anyhow::Result<Self> {
        let data_dir = match &global.data_dir {
            Some(dir) => PathBuf::from(dir),
            None => resolve_data_dir().context(
                "could not determine the genglossary data directory (set GENGLOSSARY_DATA_DIR)",
            )?,
        };
        ensure_data_dir(&data_dir).with_context(|| format!("creating data directory {}", data_dir.display()))?;

        let config = load_config(&config_file_path(&data_dir))?.with_overrides(ConfigOverrides {
            data_dir: None,
            actor: global.actor.clone(),
            log_level: None,
            json: if global.json { Some(true) } else { None },
        });

        let actor = resolve_actor(config.actor.as_deref());

        Ok(Self { data_dir, json: global.json || config.json, verbose: global.verbose, actor })
    }

    /// Loads the layered configuration for `config show`/`config set`,
    /// independent of the CLI-flag overrides already folded into `self`.
    pub fn load_config(&self) -> anyhow::Result<AppConfig> {
        Ok(load_config(&config_file_path(&self.data_dir))?)
    }

    /// Opens the process-wide project registry under the data directory.
    pub fn open_registry(&self) -> anyhow::Result<RegistryStore> {
        let path = registry_db_path(&self.data_dir);
        RegistryStore::open(&path).with_context(|| format!("opening registry database at {}", path.display()))
    }

    /// Resolves a `project` selector (an id or a name) to its registry
    /// record. Numeric selectors are tried as ids first, since project
    /// names are free text and could themselves look numeric.
    pub fn resolve_project(&self, registry: &RegistryStore, selector: &str) -> anyhow::Result<ProjectRecord> {
        if let Ok(id) = selector.parse::<i64>() {
            if let Some(project) = registry.get_project(id)? {
                return Ok(project);
            }
        }
        registry
            .get_project_by_name(selector)?
            .ok_or_else(|| anyhow::anyhow!("no project found matching '{selector}'"))
    }
}

/// Resolves the actor name recorded on runs this process starts.
///
/// Priority: explicit override (`--actor` flag or `config.yaml`'s `actor`
/// key, already folded into `config_actor` by the caller) > `GENGLOSSARY_ACTOR`
/// env > `git config user.name` > `$USER`/`$USERNAME` > `"unknown"`.
fn resolve_actor(config_actor: Option<&str>) -> String {
    if let Some(actor) = config_actor {
        if !actor.is_empty() {
            return actor.to_string();
        }
    }

    if let Ok(actor) = env::var("GENGLOSSARY_ACTOR") {
        if !actor.is_empty() {
            return actor;
        }
    }

    if let Ok(output) = Command::new("git").args(["config", "user.name"]).output() {
        if output.status.success() {
            let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !name.is_empty() {
                return name;
            }
        }
    }

    if let Ok(user) = env::var("USER").or_else(|_| env::var("USERNAME")) {
        if !user.is_empty() {
            return user;
        }
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_project_finds_by_name() {
        let registry = RegistryStore::open_in_memory().unwrap();
        let created = registry.create_project("docs", None, "/tmp/docs.db", "ollama", "llama3", None).unwrap();

        let ctx = RuntimeContext {
            data_dir: PathBuf::from("/tmp/unused"),
            json: false,
            verbose: false,
            actor: "test".to_string(),
        };
        let found = ctx.resolve_project(&registry, "docs").unwrap();
        assert_eq!(found.id, created.id);
    }

    #[test]
    fn resolve_project_finds_by_id() {
        let registry = RegistryStore::open_in_memory().unwrap();
        let created = registry.create_project("docs", None, "/tmp/docs.db", "ollama", "llama3", None).unwrap();

        let ctx = RuntimeContext {
            data_dir: PathBuf::from("/tmp/unused"),
            json: false,
            verbose: false,
            actor: "test".to_string(),
        };
        let found = ctx.resolve_project(&registry, &created.id.to_string()).unwrap();
        assert_eq!(found.name, "docs");
    }

    #[test]
    fn resolve_project_missing_is_an_error() {
        let registry = RegistryStore::open_in_memory().unwrap();
        let ctx = RuntimeContext {
            data_dir: PathBuf::from("/tmp/unused"),
            json: false,
            verbose: false,
            actor: "test".to_string(),
        };
        assert!(ctx.resolve_project(&registry, "nope").is_err());
    }

    #[test]
    fn resolve_actor_prefers_explicit_override() {
        assert_eq!(resolve_actor(Some("alice")), "alice");
    }

    #[test]
    fn resolve_actor_falls_through_to_something_nonempty() {
        assert!(!resolve_actor(None).is_empty());
    }
}
