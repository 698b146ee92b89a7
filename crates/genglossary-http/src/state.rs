//! Shared application state: the Registry plus a lazily-populated cache of
//! per-project handles (an open [`SqliteStore`] and its [`RunManager`]).
//!
//! A handle is created once per project id on first access and kept for the
//! life of the process -- matching the Run Manager's own expectation that
//! it owns a project's run lifecycle for as long as the process is up.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use genglossary_llm::LlmConfig;
use genglossary_pipeline::{RunManager, RunManagerConfig};
use genglossary_storage::{ProjectRecord, RegistryStore, SqliteStore};

use crate::error::ApiError;

pub struct ProjectHandle {
    pub store: Arc<SqliteStore>,
    pub run_manager: Arc<RunManager>,
}

pub struct AppState {
    pub registry: Arc<RegistryStore>,
    pub data_dir: PathBuf,
    handles: Mutex<HashMap<i64, Arc<ProjectHandle>>>,
}

impl AppState {
    pub fn new(registry: Arc<RegistryStore>, data_dir: PathBuf) -> Self {
        Self { registry, data_dir, handles: Mutex::new(HashMap::new()) }
    }

    pub fn project(&self, id: i64) -> Result<ProjectRecord, ApiError> {
        self.registry
            .get_project(id)?
            .ok_or_else(|| ApiError::NotFound(format!("project {id} not found")))
    }

    /// Returns the cached handle for `id`, opening the project database and
    /// constructing a fresh [`RunManager`] on first access.
    pub fn handle(&self, id: i64) -> Result<Arc<ProjectHandle>, ApiError> {
        if let Some(handle) = self.handles.lock().unwrap().get(&id) {
            return Ok(handle.clone());
        }

        let record = self.project(id)?;
        let store = Arc::new(SqliteStore::open(&record.db_path)?);

        let provider = record.llm_provider.parse().unwrap_or_default();
        let llm = LlmConfig::new(provider, record.llm_model.clone(), record.llm_base_url.clone());
        let config = RunManagerConfig::new(
            PathBuf::from(&record.db_path),
            record.doc_root.as_ref().map(PathBuf::from),
            llm,
        );
        let run_manager = Arc::new(RunManager::new(store.clone(), config));

        let handle = Arc::new(ProjectHandle { store, run_manager });
        self.handles.lock().unwrap().insert(id, handle.clone());
        Ok(handle)
    }
}
