//! `genglossary run ...` -- run lifecycle control.
//!
//! `start` blocks for the life of the run: it spawns the worker thread via
//! [`RunManager::start_run`] and then polls the run's own status until it
//! reaches a terminal state, printing whatever the Log Bus subscription has
//! buffered at each poll. Polling the row rather than blocking on the Log
//! Bus's terminal marker avoids a race for fast/empty runs -- the worker
//! thread can finish and publish its terminal event before this process
//! gets around to subscribing. Cancelling a run started by a *different*
//! process only reaches as far as the database -- the in-process
//! cancellation signal lives in that other process's `RunManager` and
//! cannot be set from here.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use genglossary_core::enums::RunStatus;
use genglossary_core::validation::parse_scope;
use genglossary_llm::LlmConfig;
use genglossary_pipeline::{RunManager, RunManagerConfig};
use genglossary_storage::SqliteStore;

use crate::cli::{CancelRunArgs, LogsRunArgs, ProjectRef, StartRunArgs};
use crate::context::RuntimeContext;
use crate::output::{colored_run_status, format_run_row, output_json, output_table};

fn build_run_manager(project: &genglossary_storage::ProjectRecord) -> anyhow::Result<RunManager> {
    let store = Arc::new(SqliteStore::open(&project.db_path)?);
    let provider = project.llm_provider.parse().unwrap_or_default();
    let llm = LlmConfig::new(provider, project.llm_model.clone(), project.llm_base_url.clone());
    let config = RunManagerConfig::new(
        PathBuf::from(&project.db_path),
        project.doc_root.as_ref().map(PathBuf::from),
        llm,
    );
    Ok(RunManager::new(store, config))
}

pub fn run_start(ctx: &RuntimeContext, args: &StartRunArgs) -> anyhow::Result<()> {
    let scope = parse_scope(&args.scope)?;
    let registry = ctx.open_registry()?;
    let project = ctx.resolve_project(&registry, &args.project)?;
    let manager = build_run_manager(&project)?;
    let triggered_by = args.triggered_by.as_deref().unwrap_or(&ctx.actor);

    tracing::debug!(project = %project.name, scope = %scope, triggered_by, "starting run");
    let run = manager.start_run(scope, triggered_by)?;

    if args.detach {
        if ctx.json {
            output_json(&run);
        } else {
            println!("started run {} (scope: {})", run.id, run.scope);
        }
        return Ok(());
    }

    let subscription = manager.subscribe_logs(run.id);
    let finished = loop {
        while let Some(event) = subscription.try_recv() {
            if event.complete {
                continue;
            }
            if ctx.json {
                output_json(&event_view(&event));
            } else {
                print_log_line(&event);
            }
        }

        let current = manager.get(run.id)?.ok_or_else(|| anyhow::anyhow!("run {} vanished mid-execution", run.id))?;
        if current.status.is_terminal() {
            break current;
        }
        std::thread::sleep(Duration::from_millis(50));
    };

    if ctx.json {
        output_json(&finished);
    } else {
        println!("run {} finished: {}", finished.id, colored_run_status(finished.status));
    }

    if finished.status == RunStatus::Failed {
        anyhow::bail!(finished.error_message.clone().unwrap_or_else(|| "run failed".to_string()));
    }
    Ok(())
}

pub fn run_cancel(ctx: &RuntimeContext, args: &CancelRunArgs) -> anyhow::Result<()> {
    let registry = ctx.open_registry()?;
    let project = ctx.resolve_project(&registry, &args.project)?;
    let store = SqliteStore::open(&project.db_path)?;
    store.cancel_run(args.run_id)?;

    if !ctx.json {
        println!("requested cancellation of run {}", args.run_id);
    }
    Ok(())
}

pub fn run_status(ctx: &RuntimeContext, args: &ProjectRef) -> anyhow::Result<()> {
    let registry = ctx.open_registry()?;
    let project = ctx.resolve_project(&registry, &args.project)?;
    let store = SqliteStore::open(&project.db_path)?;
    let current = store.get_current_or_latest_run()?;

    match current {
        Some(run) if ctx.json => output_json(&run),
        Some(run) => output_table(
            &["ID", "Scope", "Status", "Progress", "Triggered by", "Error"],
            std::slice::from_ref(&format_run_row(&run)),
        ),
        None if ctx.json => output_json(&Option::<()>::None),
        None => println!("no runs recorded for this project"),
    }
    Ok(())
}

pub fn run_list(ctx: &RuntimeContext, args: &ProjectRef) -> anyhow::Result<()> {
    let registry = ctx.open_registry()?;
    let project = ctx.resolve_project(&registry, &args.project)?;
    let store = SqliteStore::open(&project.db_path)?;
    let runs = store.list_runs()?;

    if ctx.json {
        output_json(&runs);
    } else {
        let rows = runs.iter().map(format_run_row).collect::<Vec<_>>();
        output_table(&["ID", "Scope", "Status", "Progress", "Triggered by", "Error"], &rows);
    }
    Ok(())
}

/// Watches a run by polling its database row rather than the Log Bus: a
/// fresh `RunManager` in this process has no subscribers registered for a
/// run started elsewhere, so there is nothing to stream. The row's
/// `current_step`/`progress_current`/`progress_total` columns are the only
/// cross-process signal available.
pub fn run_logs(ctx: &RuntimeContext, args: &LogsRunArgs) -> anyhow::Result<()> {
    let registry = ctx.open_registry()?;
    let project = ctx.resolve_project(&registry, &args.project)?;
    let store = SqliteStore::open(&project.db_path)?;

    loop {
        let run = store.get_run(args.run_id)?.ok_or_else(|| anyhow::anyhow!("no such run: {}", args.run_id))?;

        if ctx.json {
            output_json(&run);
        } else {
            match &run.current_step {
                Some(step) => println!(
                    "[{}] {step}: {}/{}",
                    colored_run_status(run.status),
                    run.progress_current,
                    run.progress_total
                ),
                None => println!("[{}] (no progress recorded yet)", colored_run_status(run.status)),
            }
        }

        if !args.follow || run.status.is_terminal() {
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(500));
    }
}

#[derive(serde::Serialize)]
struct LogEventView<'a> {
    level: &'a str,
    message: &'a str,
    step: &'a Option<String>,
    progress_current: Option<i64>,
    progress_total: Option<i64>,
}

fn event_view(event: &genglossary_pipeline::LogEvent) -> LogEventView<'_> {
    LogEventView {
        level: event.level.as_str(),
        message: &event.message,
        step: &event.step,
        progress_current: event.progress_current,
        progress_total: event.progress_total,
    }
}

fn print_log_line(event: &genglossary_pipeline::LogEvent) {
    match (&event.step, event.progress_current, event.progress_total) {
        (Some(step), Some(current), Some(total)) => {
            println!("[{}] {step}: {current}/{total} -- {}", event.level.as_str(), event.message)
        }
        _ => println!("[{}] {}", event.level.as_str(), event.message),
    }
}
