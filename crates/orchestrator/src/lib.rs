//! Turn orchestrator for the Messenger report bot.
//!
//! This crate provides the [`Orchestrator`] type which runs one conversation
//! turn per inbound Messenger event, and the [`Dispatcher`] which feeds it
//! from a bounded queue.
//!
//! # Architecture
//!
//! ```text
//! InboundEvent (from the webhook)
//!          ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ORCHESTRATOR                           │
//! │                                                             │
//! │  1. Log message (skip if processed), mark seen, typing on   │
//! │         ↓                                                   │
//! │  2. Build Action (text / payload / stored attachments)      │
//! │         ↓                                                   │
//! │  3. Load context, draft and preference                      │
//! │         ↓                                                   │
//! │  4. StateMachine: receive_context → generate_reply          │
//! │         ↓                                                   │
//! │  5. Commit report, or persist the conversation              │
//! │         ↓                                                   │
//! │  6. Send and log the reply, typing off                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use messenger::{GraphConfig, MessengerClient};
//! use orchestrator::{
//!     channel, Dispatcher, LocalMediaStore, MessengerSender, Orchestrator, SqliteStore,
//! };
//! use report_flow::FlowSettings;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MessengerClient::new(GraphConfig::with_token("page-token"))?;
//!     let store = SqliteStore::open("sqlite:pongibot.db?mode=rwc").await?;
//!     let media = LocalMediaStore::new("media", "http://127.0.0.1:8790/media")?;
//!
//!     let orchestrator = Orchestrator::new(
//!         MessengerSender::new(client),
//!         store,
//!         media,
//!         FlowSettings::default(),
//!     );
//!
//!     let (handle, rx) = channel(256);
//!     Dispatcher::new(Arc::new(orchestrator)).spawn(rx);
//!
//!     // Hand `handle` to the webhook and enqueue parsed events
//!     drop(handle);
//!     Ok(())
//! }
//! ```

mod dispatch;
mod error;
mod media;
mod memory;
mod orchestrator;
mod sender;
mod store;

pub use dispatch::{channel, DispatchHandle, Dispatcher, DEFAULT_QUEUE_SIZE};
pub use error::OrchestratorError;
pub use media::{media_key, LocalMediaStore, MediaStore, MEDIA_FOLDER};
pub use memory::{LoggedMessage, MemoryMediaStore, MemoryStore};
pub use orchestrator::Orchestrator;
pub use sender::{to_payload, MessageSender, MessengerSender, NoOpSender};
pub use store::{ConversationStore, MessageLog, ReportSink, SqliteStore, Store};

// Re-export commonly used types from dependencies
pub use messenger::{EventKind, InboundEvent};
pub use report_flow::{FlowSettings, OutboundMessage};
