//! HTTP server for resultsd

use crate::drive::DriveSource;
use crate::lookup::LookupService;
use crate::provision::{ProvisionOutcome, Provisioner};
use crate::routes;
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::Router;
use results_common::{Config, ResultsStore};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Maximum request body: 16 KiB is plenty for one form field.
/// Larger bodies fail form extraction and render the empty page.
pub const MAX_BODY_SIZE: usize = 16 * 1024;

/// Application state shared across handlers
pub struct AppState {
    pub lookup: LookupService,
}

impl AppState {
    pub fn new(store: ResultsStore) -> Self {
        Self {
            lookup: LookupService::new(store),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(ResultsStore::new(&config.data.path))
    }
}

/// Build the router with its layers
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::search_routes())
        .with_state(Arc::new(state))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
}

/// Fetch the results database from Drive unless it is already on disk
pub async fn provision(config: &Config) -> Result<ProvisionOutcome> {
    let source = DriveSource::new(&config.provision)?;
    let provisioner = Provisioner::new(&config.data.path, &config.provision);
    let outcome = provisioner.ensure(&source).await?;
    Ok(outcome)
}

/// Log schema problems for the operator. Users still just see "no match".
pub fn check_schema(store: &ResultsStore) {
    match store.inspect_schema() {
        Ok(report) if report.is_complete() => {
            info!("Results database schema OK");
        }
        Ok(report) if !report.table_present => {
            warn!(
                "Table 'records' missing in {}; every search will report no match",
                store.path().display()
            );
        }
        Ok(report) => {
            warn!(
                "Table 'records' in {} lacks columns {:?}; searches will report no match",
                store.path().display(),
                report.missing_columns
            );
        }
        Err(e) => {
            error!("Cannot inspect results database: {}", e);
        }
    }
}

/// Run the HTTP server until Ctrl-C
pub async fn run(config: &Config) -> Result<()> {
    let state = AppState::from_config(config);
    check_schema(state.lookup.store());

    let addr = config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("  Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Shutting down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
