//! Start/cancel/status lifecycle for a project's runs, and the worker
//! thread that actually executes one.
//!
//! Starting a run has a strict ordering: acquire the in-process start lock,
//! win the cross-process `start_run_if_not_active` race inside an IMMEDIATE
//! transaction, register the cancellation signal *before* releasing the
//! lock, then spawn the worker. Registering the signal first means a
//! `cancel` call that arrives the instant `start_run` returns can never find
//! the signal map empty for a run that is about to execute.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use genglossary_core::enums::{LlmProvider, RunScope, RunStatus};
use genglossary_llm::{LlmConfig, MockLlmClient};
use genglossary_storage::{ProjectMetadata, Run, SqliteStore};

use crate::error::{PipelineError, Result};
use crate::executor::{dispatch_scope, CancelSignal, ExecutionContext, DEFAULT_BATCH_SIZE};
use crate::log_bus::{LogBus, LogEvent, Subscription};
use crate::noun_extractor::{NounExtractor, SimpleNounExtractor};

/// Everything the worker thread needs that isn't reachable through the
/// database: where the documents live, how to reach the LLM, which noun
/// extractor to tokenize with, and the review/classification batch size.
/// Cloned into each spawned worker since it must outlive the `RunManager`
/// call that triggered it.
#[derive(Clone)]
pub struct RunManagerConfig {
    pub db_path: PathBuf,
    pub doc_root: Option<PathBuf>,
    pub llm: LlmConfig,
    pub api_key: Option<String>,
    pub noun_extractor: Arc<dyn NounExtractor>,
    pub batch_size: usize,
}

impl RunManagerConfig {
    pub fn new(db_path: PathBuf, doc_root: Option<PathBuf>, llm: LlmConfig) -> Self {
        Self {
            db_path,
            doc_root,
            llm,
            api_key: None,
            noun_extractor: Arc::new(SimpleNounExtractor),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Owns one project's run lifecycle. `control_store` is the connection the
/// manager itself uses for start/cancel/list bookkeeping; the worker thread
/// opens its own independent connection so a long-running stage never holds
/// the manager's connection lock.
pub struct RunManager {
    control_store: Arc<SqliteStore>,
    config: RunManagerConfig,
    start_lock: Mutex<()>,
    signals: Arc<Mutex<HashMap<i64, CancelSignal>>>,
    log_bus: Arc<LogBus>,
}

impl RunManager {
    pub fn new(control_store: Arc<SqliteStore>, config: RunManagerConfig) -> Self {
        Self {
            control_store,
            config,
            start_lock: Mutex::new(()),
            signals: Arc::new(Mutex::new(HashMap::new())),
            log_bus: Arc::new(LogBus::new()),
        }
    }

    /// Starts a new run of `scope` if none is currently active. Returns
    /// [`PipelineError::Storage`] wrapping `StorageError::AlreadyRunning` if
    /// one already is -- the caller maps that to 409 at the HTTP boundary.
    pub fn start_run(&self, scope: RunScope, triggered_by: &str) -> Result<Run> {
        let _guard = self.start_lock.lock().unwrap();

        let run = self.control_store.start_run_if_not_active(scope, triggered_by)?;

        let signal = CancelSignal::new();
        self.signals.lock().unwrap().insert(run.id, signal.clone());

        let config = self.config.clone();
        let log_bus = self.log_bus.clone();
        let signals = self.signals.clone();
        let run_id = run.id;

        let spawned = std::thread::Builder::new()
            .name(format!("genglossary-run-{run_id}"))
            .spawn(move || execute_run(run_id, scope, config, log_bus, signal, signals));

        if let Err(spawn_err) = spawned {
            self.signals.lock().unwrap().remove(&run_id);
            let message = format!("failed to spawn worker thread: {spawn_err}");
            let _ = self.control_store.fail_run_if_not_terminal(run_id, &message);
            return Err(PipelineError::Internal(message));
        }

        Ok(run)
    }

    /// Requests cancellation of `run_id`. Idempotent: a run that has
    /// already reached a terminal status is left untouched (the guarded
    /// update is a no-op, not an error).
    pub fn cancel(&self, run_id: i64) -> Result<()> {
        if let Some(signal) = self.signals.lock().unwrap().get(&run_id) {
            signal.set();
        }
        self.control_store.cancel_run(run_id)?;
        Ok(())
    }

    pub fn current(&self) -> Result<Option<Run>> {
        Ok(self.control_store.get_current_or_latest_run()?)
    }

    pub fn get(&self, run_id: i64) -> Result<Option<Run>> {
        Ok(self.control_store.get_run(run_id)?)
    }

    pub fn list_runs(&self) -> Result<Vec<Run>> {
        Ok(self.control_store.list_runs()?)
    }

    pub fn subscribe_logs(&self, run_id: i64) -> Subscription {
        self.log_bus.subscribe(run_id)
    }
}

/// Runs inside the dedicated worker thread for one run. Opens its own
/// connection, executes the scope's stages, and finalizes the run's status
/// following the three-rule resolution: cancellation wins over any error
/// that happened after it was observed, any other error fails the run, and
/// otherwise the run completes unless a cancel raced in after the last
/// stage already returned (in which case the guarded update is a no-op and
/// the row is left `cancelled`). Every return path below removes this run's
/// entry from `signals` -- that map must never grow past the number of
/// currently active runs.
fn execute_run(
    run_id: i64,
    scope: RunScope,
    config: RunManagerConfig,
    log_bus: Arc<LogBus>,
    cancel: CancelSignal,
    signals: Arc<Mutex<HashMap<i64, CancelSignal>>>,
) {
    let log_bus_for_ctx = log_bus.clone();
    let log: Arc<dyn Fn(LogEvent) + Send + Sync> = Arc::new(move |event| log_bus_for_ctx.publish(event));
    let ctx = ExecutionContext::new(run_id, log.clone(), cancel);

    let store = match SqliteStore::open(&config.db_path) {
        Ok(store) => store,
        Err(e) => {
            // Without a store there is no row left to finalize; log and stop.
            ctx_log_error(&ctx, run_id, &format!("failed to open project database: {e}"));
            signals.lock().unwrap().remove(&run_id);
            log_bus.publish(LogEvent::terminal(run_id));
            return;
        }
    };

    let outcome = run_to_completion(run_id, scope, &config, &ctx, &store);
    finalize(&store, run_id, &ctx, outcome.err());
    signals.lock().unwrap().remove(&run_id);

    log_bus.publish(LogEvent::terminal(run_id));
}

fn run_to_completion(
    run_id: i64,
    scope: RunScope,
    config: &RunManagerConfig,
    ctx: &ExecutionContext,
    store: &SqliteStore,
) -> Result<()> {
    store.transition_run_to_running(run_id)?;
    store.set_metadata(&ProjectMetadata {
        input_path: config.doc_root.as_ref().map(|p| p.display().to_string()),
        llm_provider: config.llm.provider.to_string(),
        llm_model: config.llm.model.clone(),
        llm_base_url: Some(config.llm.base_url.clone()),
    })?;
    tracing::debug!(run_id, scope = %scope, "wrote project metadata for run");

    let llm = build_llm_client(config);
    dispatch_scope(
        ctx,
        store,
        scope,
        llm.as_ref(),
        config.noun_extractor.as_ref(),
        config.batch_size,
        config.doc_root.as_deref(),
    )
}

fn build_llm_client(config: &RunManagerConfig) -> Arc<dyn genglossary_llm::LlmClient> {
    if config.llm.provider == LlmProvider::Ollama && config.llm.base_url.is_empty() {
        // Defensive fallback only exercised by tests that skip real config wiring.
        return Arc::new(MockLlmClient::new());
    }
    genglossary_llm::build_client(config.llm.clone(), config.api_key.clone())
}

fn finalize(store: &SqliteStore, run_id: i64, ctx: &ExecutionContext, error: Option<PipelineError>) {
    match error {
        Some(PipelineError::Cancelled) => {
            ctx_log_info(ctx, run_id, "run cancelled");
            let _ = store.cancel_run(run_id);
        }
        Some(e) => {
            ctx_log_error(ctx, run_id, &format!("run failed: {e}"));
            if let Err(retry_err) = store.fail_run_if_not_terminal(run_id, &e.to_string()) {
                ctx_log_error(ctx, run_id, &format!("failed to persist failure status: {retry_err}"));
            }
        }
        None => {
            // `complete_if_not_cancelled` is a no-op if a cancel raced in
            // after the last stage returned; the row stays `cancelled`.
            let _ = store.complete_run_if_not_cancelled(run_id);
        }
    }
}

fn ctx_log_info(ctx: &ExecutionContext, run_id: i64, message: &str) {
    (ctx.log)(LogEvent::info(run_id, message.to_string()));
}

fn ctx_log_error(ctx: &ExecutionContext, run_id: i64, message: &str) {
    (ctx.log)(LogEvent::error(run_id, message.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn mock_config(db_path: PathBuf) -> RunManagerConfig {
        RunManagerConfig {
            db_path,
            doc_root: None,
            llm: LlmConfig::new(LlmProvider::Ollama, "llama3", Some(String::new())),
            api_key: None,
            noun_extractor: Arc::new(SimpleNounExtractor),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    #[test]
    fn second_start_while_active_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("project.db");
        let control = Arc::new(SqliteStore::open(&db_path).unwrap());
        let manager = RunManager::new(control.clone(), mock_config(db_path));

        manager.start_run(RunScope::Extract, "alice").unwrap();
        let result = manager.start_run(RunScope::Generate, "bob");
        assert!(result.is_err());
    }

    #[test]
    fn cancel_is_idempotent_on_unknown_run() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("project.db");
        let control = Arc::new(SqliteStore::open(&db_path).unwrap());
        let manager = RunManager::new(control, mock_config(db_path));

        assert!(manager.cancel(999).is_ok());
    }

    #[test]
    fn current_reflects_most_recent_run() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("project.db");
        let control = Arc::new(SqliteStore::open(&db_path).unwrap());
        let manager = RunManager::new(control, mock_config(db_path));

        assert!(manager.current().unwrap().is_none());
        let run = manager.start_run(RunScope::Extract, "alice").unwrap();

        // Give the worker thread a moment; document loading with no doc_root
        // and no stored documents fails fast, so the run finalizes quickly.
        for _ in 0..50 {
            if let Some(current) = manager.current().unwrap() {
                if current.status.is_terminal() {
                    break;
                }
            }
            thread::sleep(Duration::from_millis(20));
        }

        let current = manager.current().unwrap().unwrap();
        assert_eq!(current.id, run.id);
        assert_eq!(current.status, RunStatus::Failed);
    }
}
