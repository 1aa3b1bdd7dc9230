use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info};

use albuquery_gateway::api::routes::create_router_with_state;
use albuquery_gateway::config::Config;
use albuquery_gateway::services::database::MySqlExecutor;
use albuquery_gateway::services::{
    AsyncQueryService, BackendCredentials, ConnectionPoolManager, QueryRegistry, ResultStore,
};
use albuquery_gateway::storage::SqliteStorage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.logging.level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting server on {}", config.server_address());

    // Initialize SQLite catalog
    let catalog = Arc::new(SqliteStorage::new(&config.catalog.url).await.map_err(|e| {
        error!("Failed to open catalog {}: {}", config.catalog.url, e);
        e
    })?);

    tokio::fs::create_dir_all(&config.results.base_path).await?;
    info!("Writing results under {}", config.results.base_path);

    let pools = Arc::new(ConnectionPoolManager::with_config(
        BackendCredentials {
            user: config.backend.user.clone(),
            password: config.backend.password.clone(),
        },
        config.backend.max_connections,
        0,
    ));
    let executor = Arc::new(MySqlExecutor::new(pools.clone()));

    let query_service = AsyncQueryService::new(
        catalog,
        executor,
        QueryRegistry::new(),
        ResultStore::new(&config.results.base_path),
    );
    let app = create_router_with_state(query_service);

    // Start server
    let addr: SocketAddr = config.server_address().parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pools.disconnect_all().await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}
