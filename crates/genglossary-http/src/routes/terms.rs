//! Term repository endpoints: the unified listing plus the override and
//! synonym-group writes a user makes between pipeline runs.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use genglossary_core::enums::TermSource;
use genglossary_storage::{ListedTerm, SynonymGroup, TermOverride};

use crate::error::ApiError;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/projects/{id}/terms", get(list_terms))
        .route("/projects/{id}/terms/exclude", post(exclude_term))
        .route("/projects/{id}/terms/require", post(require_term))
        .route("/projects/{id}/terms/synonyms", get(list_synonyms).post(create_synonym_group))
}

async fn list_terms(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ListedTerm>>, ApiError> {
    let handle = state.handle(id)?;
    let terms = tokio::task::spawn_blocking(move || handle.store.list_all_terms())
        .await
        .map_err(|e| ApiError::TaskPanicked(format!("store task panicked: {e}")))??;
    Ok(Json(terms))
}

#[derive(Debug, Deserialize)]
struct TermOverrideRequest {
    term_text: String,
    #[serde(default)]
    source: TermSource,
}

async fn exclude_term(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(request): Json<TermOverrideRequest>,
) -> Result<Json<Vec<TermOverride>>, ApiError> {
    let handle = state.handle(id)?;
    let overrides = tokio::task::spawn_blocking(move || {
        handle.store.exclude_term(&request.term_text, request.source)?;
        handle.store.list_excluded_terms()
    })
    .await
    .map_err(|e| ApiError::TaskPanicked(format!("store task panicked: {e}")))??;
    Ok(Json(overrides))
}

async fn require_term(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(request): Json<TermOverrideRequest>,
) -> Result<Json<Vec<TermOverride>>, ApiError> {
    let handle = state.handle(id)?;
    let overrides = tokio::task::spawn_blocking(move || {
        handle.store.require_term(&request.term_text, request.source)?;
        handle.store.list_required_terms()
    })
    .await
    .map_err(|e| ApiError::TaskPanicked(format!("store task panicked: {e}")))??;
    Ok(Json(overrides))
}

async fn list_synonyms(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<SynonymGroup>>, ApiError> {
    let handle = state.handle(id)?;
    let groups = tokio::task::spawn_blocking(move || handle.store.list_synonym_groups())
        .await
        .map_err(|e| ApiError::TaskPanicked(format!("store task panicked: {e}")))??;
    Ok(Json(groups))
}

#[derive(Debug, Deserialize)]
struct CreateSynonymGroupRequest {
    primary_term_text: String,
    #[serde(default)]
    other_members: Vec<String>,
}

async fn create_synonym_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(request): Json<CreateSynonymGroupRequest>,
) -> Result<Json<Vec<SynonymGroup>>, ApiError> {
    let handle = state.handle(id)?;
    let groups = tokio::task::spawn_blocking(move || {
        handle.store.create_synonym_group(&request.primary_term_text, &request.other_members)?;
        handle.store.list_synonym_groups()
    })
    .await
    .map_err(|e| ApiError::TaskPanicked(format!("store task panicked: {e}")))??;
    Ok(Json(groups))
}
