use sentinel_backend::config::SentinelConfig;
use sentinel_backend::module::catalog::CatalogManager;
use sentinel_backend::module::scheduled::{ScheduledTaskConfig, ScheduledTaskManager};
use sentinel_backend::service;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = SentinelConfig::load("config.toml")?;

    // Initialize logging
    let _logging_guard =
        sentinel_backend::logging::init_logging("logs", "sentinel-backend", &config.log_level)?;

    tracing::info!("Orbit Sentinel backend starting...");
    tracing::info!("Server will listen on {}", config.server_address());

    // Initialize catalog manager
    let catalog = CatalogManager::from_config(&config)?;
    catalog.initialize().await;
    tracing::info!("Catalog manager initialized successfully");

    // Configure and start scheduled tasks
    let task_manager = if config.refresh.enabled {
        let mut task_manager =
            ScheduledTaskManager::new(ScheduledTaskConfig::from(&config.refresh), catalog.clone());
        task_manager.start_all();
        Some(task_manager)
    } else {
        tracing::info!("Scheduled TLE refresh disabled");
        None
    };

    let app = service::router(catalog);

    let listener = tokio::net::TcpListener::bind(config.server_address()).await?;
    tracing::info!("HTTP server starting on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

    if let Some(task_manager) = task_manager {
        task_manager.shutdown();
    }

    Ok(())
}
