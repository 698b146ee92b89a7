//! Glossary reads plus the Markdown export fallback renderer.
//!
//! The real Markdown emitter is an external collaborator out of scope
//! here; this renders a minimal table per stage so the endpoint is never a
//! stub.

use std::fmt::Write as _;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use genglossary_storage::{GlossaryEntry, GlossaryIssue, GlossaryStage};

use crate::error::ApiError;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/projects/{id}/glossary", get(show_glossary))
        .route("/projects/{id}/glossary/issues", get(list_issues))
        .route("/projects/{id}/glossary/export", get(export_markdown))
}

#[derive(Debug, Deserialize)]
struct StageQuery {
    #[serde(default)]
    stage: StageParam,
}

#[derive(Debug, Default, Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum StageParam {
    #[default]
    Provisional,
    Refined,
}

impl From<StageParam> for GlossaryStage {
    fn from(value: StageParam) -> Self {
        match value {
            StageParam::Provisional => GlossaryStage::Provisional,
            StageParam::Refined => GlossaryStage::Refined,
        }
    }
}

async fn show_glossary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<StageQuery>,
) -> Result<Json<Vec<GlossaryEntry>>, ApiError> {
    let handle = state.handle(id)?;
    let stage: GlossaryStage = query.stage.into();
    let entries = tokio::task::spawn_blocking(move || handle.store.list_glossary(stage))
        .await
        .map_err(|e| ApiError::TaskPanicked(format!("store task panicked: {e}")))??;
    Ok(Json(entries))
}

async fn list_issues(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<GlossaryIssue>>, ApiError> {
    let handle = state.handle(id)?;
    let issues = tokio::task::spawn_blocking(move || handle.store.list_glossary_issues())
        .await
        .map_err(|e| ApiError::TaskPanicked(format!("store task panicked: {e}")))??;
    Ok(Json(issues))
}

async fn export_markdown(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<StageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let project = state.project(id)?;
    let handle = state.handle(id)?;
    let stage: GlossaryStage = query.stage.into();
    let entries = tokio::task::spawn_blocking(move || handle.store.list_glossary(stage))
        .await
        .map_err(|e| ApiError::TaskPanicked(format!("store task panicked: {e}")))??;

    let markdown = render_markdown(&project.name, &entries);
    Ok(([(header::CONTENT_TYPE, "text/markdown; charset=utf-8")], markdown))
}

fn render_markdown(project_name: &str, entries: &[GlossaryEntry]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {project_name} glossary\n");
    let _ = writeln!(out, "| Term | Definition | Confidence |");
    let _ = writeln!(out, "|------|------------|------------|");
    for entry in entries {
        let _ = writeln!(
            out,
            "| {} | {} | {:.2} |",
            entry.term_name.replace('|', "\\|"),
            entry.definition.replace('|', "\\|").replace('\n', " "),
            entry.confidence,
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_a_table_with_escaped_pipes() {
        let entries = vec![GlossaryEntry {
            id: 1,
            term_name: "widget".into(),
            definition: "a | pipe-containing definition".into(),
            confidence: 0.75,
            occurrences: vec![],
        }];
        let markdown = render_markdown("docs", &entries);
        assert!(markdown.contains("# docs glossary"));
        assert!(markdown.contains("a \\| pipe-containing definition"));
        assert!(markdown.contains("0.75"));
    }

    #[test]
    fn renders_header_even_with_no_entries() {
        let markdown = render_markdown("docs", &[]);
        assert!(markdown.contains("| Term | Definition | Confidence |"));
    }
}
