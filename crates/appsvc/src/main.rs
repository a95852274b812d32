//! App service - app catalog and cloud gaming session API
//!
//! Serves the catalog and brokers session launches to the orchestration
//! service.

use anyhow::Result;
use appsvc::{api, config::ServiceConfig};
use appsvc_core::{
    health::{components, HealthRegistry},
    AppMetrics, AppService, JukeboxClient, LaunchRequestBuilder, MemoryCatalog, StructuredLogger,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const APPSVC_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting appsvc");

    let config = ServiceConfig::load()?;
    let static_config = Arc::new(config.static_config()?);
    info!(node_name = %config.node_name, jukeboxsvc_url = %config.jukeboxsvc_url, "Service configured");

    let health_registry = HealthRegistry::new();
    health_registry.register(components::CATALOG).await;
    health_registry.register(components::ORCHESTRATOR).await;

    let metrics = AppMetrics::new();
    // an unreadable seed keeps the process up but not ready
    let catalog = match MemoryCatalog::load(&config.catalog_path).await {
        Ok(catalog) => catalog,
        Err(e) => {
            error!(
                error = %e,
                path = %config.catalog_path.display(),
                "Failed to load catalog seed"
            );
            health_registry
                .set_unhealthy(components::CATALOG, format!("seed not loaded: {e}"))
                .await;
            MemoryCatalog::default()
        }
    };
    let catalog = Arc::new(catalog);
    metrics.set_catalog_releases(catalog.release_count() as i64);

    let orchestrator = Arc::new(JukeboxClient::new(&config.jukeboxsvc_url)?);
    let launcher = LaunchRequestBuilder::new(static_config.clone(), catalog.clone(), catalog.clone());

    let logger = StructuredLogger::new(&config.node_name);
    logger.log_startup(
        APPSVC_VERSION,
        &static_config.known_dcs,
        static_config.runners.len(),
    );

    let service = Arc::new(AppService::new(
        catalog,
        launcher,
        orchestrator,
        health_registry.clone(),
        logger.clone(),
    ));
    let app_state = api::AppState::new(service);

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        res = api_handle => {
            match res {
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
                Ok(Ok(())) => {}
            }
            logger.log_shutdown("API server exited");
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }
    info!("Shutting down");

    Ok(())
}
