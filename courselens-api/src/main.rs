//! courselens-api: the report surface binary.
//!
//! Serves the dashboard, the CSV/JSON exports, the RPC read API, and the
//! job-profile rows over the courselens snapshot database.

mod response;
mod routes;
mod state;

use anyhow::Context;
use courselens_core::analytics::create_engine_without;
use courselens_core::{logging, Config, Database};
use state::AppState;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load config")?;
    let _guard = logging::init(&config.logging).context("failed to init logging")?;

    let db_path = Config::database_path();
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run migrations")?;

    let engine = create_engine_without(&config.report.disabled_adapters);
    tracing::info!(
        adapters = ?engine.adapter_names(),
        db = %db_path.display(),
        "Aggregation engine ready"
    );

    let state = Arc::new(AppState { db, engine });
    let router = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;
    tracing::info!(addr = %config.server.bind_addr, "Report surface listening");

    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
