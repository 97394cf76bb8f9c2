//! Error types for the messenger crate.

use thiserror::Error;

/// Errors that can occur when talking to the Messenger Platform.
#[derive(Debug, Error)]
pub enum MessengerError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The Graph API rejected the call.
    #[error("Graph API error {code}: {message}")]
    Api { code: i64, message: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Sender action outside the supported set.
    #[error("Invalid sender action: {0}")]
    InvalidSenderAction(String),
}
