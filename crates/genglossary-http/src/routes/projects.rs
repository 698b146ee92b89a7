//! Registry CRUD: read-only plus creation, since projects are cheap rows
//! and do not go through the Run Manager.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use genglossary_config::data_dir::project_db_path;
use genglossary_storage::ProjectRecord;

use crate::error::ApiError;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route("/projects/{id}", get(show_project))
}

async fn list_projects(State(state): State<Arc<AppState>>) -> Result<Json<Vec<ProjectRecord>>, ApiError> {
    let registry = state.registry.clone();
    let projects = tokio::task::spawn_blocking(move || registry.list_projects())
        .await
        .map_err(|e| ApiError::TaskPanicked(format!("registry task panicked: {e}")))??;
    Ok(Json(projects))
}

async fn show_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ProjectRecord>, ApiError> {
    Ok(Json(state.project(id)?))
}

#[derive(Debug, Deserialize)]
struct CreateProjectRequest {
    name: String,
    doc_root: Option<String>,
    #[serde(default = "default_llm_provider")]
    llm_provider: String,
    #[serde(default = "default_llm_model")]
    llm_model: String,
    llm_base_url: Option<String>,
}

fn default_llm_provider() -> String {
    "ollama".to_string()
}

fn default_llm_model() -> String {
    "llama3".to_string()
}

async fn create_project(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateProjectRequest>,
) -> Result<Json<ProjectRecord>, ApiError> {
    let data_dir = state.data_dir.clone();
    let registry = state.registry.clone();
    let project = tokio::task::spawn_blocking(move || {
        let db_path = project_db_path(&data_dir, &request.name);
        std::fs::create_dir_all(db_path.parent().unwrap())
            .map_err(|e| genglossary_storage::StorageError::Connection(e.to_string()))?;
        registry.create_project(
            &request.name,
            request.doc_root.as_deref(),
            &db_path.to_string_lossy(),
            &request.llm_provider,
            &request.llm_model,
            request.llm_base_url.as_deref(),
        )
    })
    .await
    .map_err(|e| ApiError::TaskPanicked(format!("registry task panicked: {e}")))??;

    // Touching the project database up front means the first run doesn't
    // pay schema-init cost mid-request.
    let path = project.db_path.clone();
    tokio::task::spawn_blocking(move || genglossary_storage::SqliteStore::open(path))
        .await
        .map_err(|e| ApiError::TaskPanicked(format!("store init task panicked: {e}")))??;

    Ok(Json(project))
}
