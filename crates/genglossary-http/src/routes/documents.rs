//! Read-only document listing, plus the one write the API offers directly
//! (uploading a document ahead of an Extract run that has no filesystem
//! `doc_root` to fall back to).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use genglossary_core::validation::{validate_document_size, validate_file_name};
use genglossary_storage::Document;

use crate::error::ApiError;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/projects/{id}/documents", get(list_documents).post(upload_document))
}

async fn list_documents(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let handle = state.handle(id)?;
    let documents = tokio::task::spawn_blocking(move || handle.store.list_documents())
        .await
        .map_err(|e| ApiError::TaskPanicked(format!("store task panicked: {e}")))??;
    Ok(Json(documents))
}

#[derive(Debug, Deserialize)]
struct UploadDocumentRequest {
    file_name: String,
    content: String,
}

async fn upload_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(request): Json<UploadDocumentRequest>,
) -> Result<Json<Document>, ApiError> {
    validate_file_name(&request.file_name)?;
    validate_document_size(request.content.len() as u64)?;

    let handle = state.handle(id)?;
    let document = tokio::task::spawn_blocking(move || {
        handle.store.upsert_document_by_path(&request.file_name, &request.content)
    })
    .await
    .map_err(|e| ApiError::TaskPanicked(format!("store task panicked: {e}")))??;
    Ok(Json(document))
}
