//! Messenger Platform client library.
//!
//! This crate provides the two halves of talking to Messenger:
//!
//! - Parsing webhook deliveries into [`InboundEvent`]s
//! - Sending replies and sender actions through the Send API
//!
//! # Example
//!
//! ```no_run
//! use messenger::{GraphConfig, MessagePayload, MessengerClient, SenderAction, WebhookBody};
//!
//! # async fn example(body: &str) -> Result<(), messenger::MessengerError> {
//! let config = GraphConfig::new("https://graph.facebook.com/v2.8", "page-token");
//! let client = MessengerClient::new(config)?;
//!
//! let body: WebhookBody = serde_json::from_str(body)?;
//! for event in body.events() {
//!     client.send_sender_action(&event.sender_id, SenderAction::MarkSeen).await?;
//!     client
//!         .send_message(&event.sender_id, MessagePayload::text("Got it!"))
//!         .await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::MessengerClient;
pub use config::{GraphConfig, DEFAULT_GRAPH_URL};
pub use error::MessengerError;
pub use types::*;

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
