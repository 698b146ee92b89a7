//! Run lifecycle endpoints: the one part of the surface that talks to the
//! worker thread rather than just reading a table.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio_stream::{Stream, StreamExt};

use genglossary_core::enums::RunScope;
use genglossary_storage::Run;

use crate::error::ApiError;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/projects/{id}/runs", post(start_run))
        .route("/projects/{id}/runs/current", get(current_run))
        .route("/projects/{id}/runs/{run_id}", delete(cancel_run))
        .route("/projects/{id}/runs/{run_id}/logs", get(stream_logs))
}

#[derive(Debug, Deserialize)]
struct StartRunRequest {
    scope: RunScope,
    #[serde(default = "default_triggered_by")]
    triggered_by: String,
}

fn default_triggered_by() -> String {
    "api".to_string()
}

async fn start_run(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(request): Json<StartRunRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let handle = state.handle(id)?;
    let run = tokio::task::spawn_blocking(move || handle.run_manager.start_run(request.scope, &request.triggered_by))
        .await
        .map_err(|e| ApiError::TaskPanicked(format!("run manager task panicked: {e}")))??;
    Ok((axum::http::StatusCode::CREATED, Json(run)))
}

async fn current_run(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Option<Run>>, ApiError> {
    let handle = state.handle(id)?;
    let run = tokio::task::spawn_blocking(move || handle.run_manager.current())
        .await
        .map_err(|e| ApiError::TaskPanicked(format!("run manager task panicked: {e}")))??;
    Ok(Json(run))
}

async fn cancel_run(
    State(state): State<Arc<AppState>>,
    Path((id, run_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let handle = state.handle(id)?;
    tokio::task::spawn_blocking(move || handle.run_manager.cancel(run_id))
        .await
        .map_err(|e| ApiError::TaskPanicked(format!("run manager task panicked: {e}")))??;
    Ok(axum::http::StatusCode::OK)
}

/// Bridges the Log Bus's blocking [`genglossary_pipeline::Subscription`]
/// into an async SSE stream: a dedicated blocking task drains `recv()` in a
/// loop and forwards each event over a standard channel, which is wrapped
/// as a `Stream` for axum's SSE response.
async fn stream_logs(
    State(state): State<Arc<AppState>>,
    Path((id, run_id)): Path<(i64, i64)>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let handle = state.handle(id)?;
    let (tx, rx) = tokio::sync::mpsc::channel(32);

    std::thread::spawn(move || {
        let subscription = handle.run_manager.subscribe_logs(run_id);
        loop {
            let event = subscription.recv();
            let complete = event.complete;
            let payload = serde_json::to_string(&SerializableLogEvent::from(&event)).unwrap_or_default();
            let sse_event = if complete {
                Event::default().event("complete").data(payload)
            } else {
                Event::default().event("log").data(payload)
            };
            if tx.blocking_send(sse_event).is_err() || complete {
                break;
            }
        }
    });

    let stream = tokio_stream::wrappers::ReceiverStream::new(rx).map(Ok);
    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

#[derive(serde::Serialize)]
struct SerializableLogEvent {
    run_id: i64,
    level: &'static str,
    message: String,
    timestamp: String,
    step: Option<String>,
    progress_current: Option<i64>,
    progress_total: Option<i64>,
    current_term: Option<String>,
    complete: bool,
}

impl From<&genglossary_pipeline::LogEvent> for SerializableLogEvent {
    fn from(event: &genglossary_pipeline::LogEvent) -> Self {
        Self {
            run_id: event.run_id,
            level: event.level.as_str(),
            message: event.message.clone(),
            timestamp: event.timestamp.clone(),
            step: event.step.clone(),
            progress_current: event.progress_current,
            progress_total: event.progress_total,
            current_term: event.current_term.clone(),
            complete: event.complete,
        }
    }
}
