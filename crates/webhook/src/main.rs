//! Messenger webhook server for the report bot.
//!
//! Receives webhook deliveries, queues the user events for the turn
//! dispatcher, and serves stored attachments for report cards.

mod config;
mod error;
mod routes;
mod state;

use std::sync::Arc;

use messenger::{GraphConfig, MessengerClient};
use orchestrator::{
    channel, Dispatcher, LocalMediaStore, MessengerSender, Orchestrator, SqliteStore,
};
use tower_http::services::ServeDir;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(addr = %config.addr, "Starting pongibot");

    // Persistence and collaborators
    let store = SqliteStore::open(&config.database_url).await?;
    let client = MessengerClient::new(GraphConfig::new(
        &config.graph_api_url,
        &config.page_access_token,
    ))?;
    let media = LocalMediaStore::new(&config.media_dir, &config.media_base_url)?;
    tokio::fs::create_dir_all(&config.media_dir).await?;

    let orchestrator = Orchestrator::new(
        MessengerSender::new(client),
        store,
        media,
        config.flow_settings(),
    );

    // Turn queue
    let (dispatch, rx) = channel(config.queue_size);
    Dispatcher::new(Arc::new(orchestrator)).spawn(rx);

    // Build application state
    let state = AppState::new(config.verify_token.as_str(), dispatch);

    // Build router
    let app = routes::router()
        .nest_service("/media", ServeDir::new(&config.media_dir))
        .with_state(state);

    // Start server
    info!(addr = %config.addr, "Webhook server listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
