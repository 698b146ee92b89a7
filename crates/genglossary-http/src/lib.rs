//! Thin axum REST + SSE boundary over the synchronous pipeline core.
//!
//! Nothing in here does pipeline work directly: every handler either reads
//! a repository through a blocking task, or hands a request to the
//! project's [`genglossary_pipeline::RunManager`]. The async runtime exists
//! purely as an I/O front door (see [`genglossary_pipeline`] crate docs).

pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;

pub use error::ApiError;
pub use state::{AppState, ProjectHandle};

/// Builds the full router over a shared [`AppState`].
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::projects::router())
        .merge(routes::runs::router())
        .merge(routes::documents::router())
        .merge(routes::terms::router())
        .merge(routes::glossary::router())
        .with_state(state)
}
