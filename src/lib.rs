pub mod api;
pub mod chat;
pub mod config;
pub mod db;
pub mod insights;
pub mod llm;
pub mod models;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::server::start_server;
use crate::api::types::ApiContext;
use crate::llm::GeminiClient;

/// Initialize logging, migrate the database, and serve the API until
/// interrupted.
pub async fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("Palaver starting v{}", config::APP_VERSION);

    let db_path = config::database_path();
    if let Err(e) = db::open_database(&db_path) {
        tracing::error!("Cannot open database at {}: {e}", db_path.display());
        std::process::exit(1);
    }

    let ctx = ApiContext::new(db_path, Arc::new(GeminiClient::from_env()));
    let mut server = match start_server(ctx, config::bind_addr()).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    server.shutdown();
}
