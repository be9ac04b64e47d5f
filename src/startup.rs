//! Wiring: build the clients from configuration and serve the router

use std::sync::Arc;
use tokio::signal;
use tracing::info;

use crate::api::{build_router, AppState};
use crate::completion::{AzureOpenAiClient, CompletionClient};
use crate::config::Config;
use crate::context::{TiktokenCounter, TokenCounter, ENCODING_NAME};
use crate::error::{RelayError, Result};
use crate::handler::QueryHandler;
use crate::search::{AzureSearchClient, SearchClient};

/// Build the query handler with the Azure clients and the shared tokenizer
pub fn init_query_handler(config: &Config) -> Result<QueryHandler> {
    config.validate()?;

    let counter: Arc<dyn TokenCounter> = Arc::new(TiktokenCounter::new()?);
    info!(encoding = ENCODING_NAME, "Tokenizer loaded");

    let search: Arc<dyn SearchClient> = Arc::new(AzureSearchClient::new(&config.search)?);
    let completion: Arc<dyn CompletionClient> =
        Arc::new(AzureOpenAiClient::new(&config.completion, &config.prompt)?);

    QueryHandler::new(search, completion, counter, config.budget.clone())
}

/// Serve until Ctrl+C
pub async fn serve(config: Config) -> Result<()> {
    let handler = init_query_handler(&config)?;
    let app = build_router(AppState::new(handler), config.server.max_body_bytes);

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| RelayError::Internal(format!("Failed to bind {}: {}", address, e)))?;

    info!(%address, "Query relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| RelayError::Internal(format!("Server error: {}", e)))?;

    info!("Query relay stopped");
    Ok(())
}

/// Resolves when Ctrl+C is pressed
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
