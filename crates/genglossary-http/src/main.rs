//! Entry point for the `genglossary-server` binary.

use std::sync::Arc;

use genglossary_config::data_dir::{ensure_data_dir, registry_db_path, resolve_data_dir_or_error};
use genglossary_storage::RegistryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let data_dir = resolve_data_dir_or_error()?;
    ensure_data_dir(&data_dir)?;

    let registry = Arc::new(RegistryStore::open(registry_db_path(&data_dir))?);
    let state = Arc::new(genglossary_http::AppState::new(registry, data_dir));
    let app = genglossary_http::app(state);

    let addr = std::env::var("GENGLOSSARY_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8420".to_string());
    tracing::info!(%addr, "starting genglossary-server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
