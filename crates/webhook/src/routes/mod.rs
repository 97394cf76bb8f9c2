//! Route handlers for the webhook server.

pub mod health;
pub mod webhook;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // Messenger
        .route("/webhook", get(webhook::verify).post(webhook::receive))
        // Health check
        .route("/health", get(health::health))
}
