//! Discovery of the genglossary data directory.
//!
//! The data directory holds the process-wide registry database and one
//! subdirectory per project. It is a single fixed, user-scoped location --
//! there is no per-repository nesting to search for, only an optional
//! environment-variable override.

use std::path::{Path, PathBuf};

use crate::config::ConfigError;

/// Overrides the conventional `~/.genglossary` location.
const DATA_DIR_ENV: &str = "GENGLOSSARY_DATA_DIR";

/// Returns the genglossary data directory, honoring `GENGLOSSARY_DATA_DIR`
/// if set, else `~/.genglossary`.
pub fn resolve_data_dir() -> Option<PathBuf> {
    if let Ok(env_dir) = std::env::var(DATA_DIR_ENV) {
        if !env_dir.is_empty() {
            return Some(PathBuf::from(env_dir));
        }
    }
    home_dir().map(|home| home.join(".genglossary"))
}

/// Same as [`resolve_data_dir`], erroring instead of returning `None` when
/// the home directory cannot be determined and no override was given.
pub fn resolve_data_dir_or_error() -> Result<PathBuf, ConfigError> {
    resolve_data_dir().ok_or(ConfigError::DataDirNotFound)
}

/// Creates the data directory (and its `projects/` subdirectory) if absent.
pub fn ensure_data_dir(data_dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(data_dir.join("projects"))
}

/// The registry database path within a data directory.
pub fn registry_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join("registry.db")
}

/// The layered configuration file path within a data directory.
pub fn config_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.yaml")
}

/// The conventional project database path for a project named `name`.
pub fn project_db_path(data_dir: &Path, name: &str) -> PathBuf {
    data_dir.join("projects").join(name).join("project.db")
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_override_wins() {
        std::env::set_var(DATA_DIR_ENV, "/tmp/genglossary-test-override");
        let dir = resolve_data_dir().unwrap();
        std::env::remove_var(DATA_DIR_ENV);
        assert_eq!(dir, PathBuf::from("/tmp/genglossary-test-override"));
    }

    #[test]
    fn project_db_path_is_namespaced_under_projects() {
        let path = project_db_path(Path::new("/data"), "my-project");
        assert_eq!(path, PathBuf::from("/data/projects/my-project/project.db"));
    }
}
