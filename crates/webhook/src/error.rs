//! Error types for the webhook server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Errors returned by the webhook handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Subscription handshake with a wrong token or mode.
    #[error("Verification failed")]
    Forbidden,

    /// Events could not be queued; Messenger will redeliver.
    #[error("Unavailable: {0}")]
    Unavailable(#[from] orchestrator::OrchestratorError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Forbidden => {
                tracing::warn!("Webhook verification failed");
                (StatusCode::FORBIDDEN, self.to_string())
            }
            AppError::Unavailable(err) => {
                tracing::error!("Failed to queue events: {}", err);
                (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
            }
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

/// Result type for webhook handlers.
pub type Result<T> = std::result::Result<T, AppError>;
