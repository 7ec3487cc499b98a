// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing_subscriber::EnvFilter;

use crate::application::index_export_service::IndexExportService;
use crate::application::panel_service::PanelDataService;
use crate::application::report_service::ReportService;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::grafana_client::GrafanaClient;
use crate::presentation::app_state::AppState;
use crate::presentation::routes::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_app_config()?;

    // Create backend client (infrastructure layer)
    let backend = Arc::new(GrafanaClient::new(
        config.grafana.url.clone(),
        config.grafana.api_key.clone(),
        Duration::from_secs(config.query.timeout_secs),
    )?);

    // Create services (application layer)
    let panel_service = PanelDataService::new(backend.clone(), &config.query);
    let report_service =
        ReportService::new(panel_service.clone(), config.report.default_title.clone());
    let export_service = IndexExportService::new(
        backend,
        config.export.max_hits,
        config.report.default_title.clone(),
    );

    // Create application state
    let state = Arc::new(AppState {
        panel_service,
        report_service,
        export_service,
    });

    // Build router (presentation layer)
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!("Starting panel report service on {} (grafana: {})", addr, config.grafana.url);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
