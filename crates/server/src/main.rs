mod bootstrap;
mod health;
mod service;
mod workflow_api;

use std::sync::Arc;

use anyhow::Result;
use opexflow_core::config::{AppConfig, LoadOptions};
use opexflow_db::SqlInitiativeRepository;
use opexflow_db::SqlTransactionLogRepository;

use crate::service::WorkflowService;

fn init_logging(config: &AppConfig) {
    use opexflow_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    let service = Arc::new(WorkflowService::new(
        Arc::new(SqlInitiativeRepository::new(app.db_pool.clone())),
        Arc::new(SqlTransactionLogRepository::new(app.db_pool.clone())),
    ));
    let router = workflow_api::router(service).merge(health::router(app.db_pool.clone()));

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        bind_address = %address,
        "opexflow-server started"
    );

    axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown()).await?;

    tracing::info!(event_name = "system.server.stopped", "opexflow-server stopped");
    Ok(())
}

async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}
