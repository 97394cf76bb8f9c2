//! Conversation state machine for the report bot.
//!
//! This crate is the pure core of the bot. Given a user's persisted
//! conversation context, draft report and preference, it consumes one inbound
//! action, moves to the next state and renders the next outbound message.
//!
//! - [`PayloadCodec`] - JSON payloads carried by quick replies and postbacks
//! - [`DraftReport`] - the report being composed, and its [`ReportRecord`]
//! - [`UserPreference`] - recently used tags and targets
//! - [`QuickReplyGenerator`] / [`ReportTemplates`] - reply content
//! - [`StateMachine`] - the states and their transitions
//!
//! # Flow
//!
//! ```text
//! inbound event
//!      ↓
//! Action { text, images, signal, start_timestamp }
//!      ↓
//! StateMachine::receive_context   (consume input, maybe transition)
//!      ↓
//! StateMachine::generate_reply    (text + quick replies, or report cards)
//!      ↓
//! caller persists context/draft, or commits the report
//! ```
//!
//! # Example
//!
//! ```rust
//! use report_flow::{Action, ConversationContext, DraftReport, Signal, StateMachine, UserPreference};
//!
//! let mut machine = StateMachine::load(
//!     ConversationContext::new(),
//!     DraftReport::new(),
//!     UserPreference::default(),
//! );
//! machine.receive_context(Action::signal(Signal::InsertNew));
//! machine.receive_context(Action::images(vec!["a.jpg".to_string()]));
//! machine.receive_context(Action::text("sunset"));
//! machine.receive_context(Action::signal(Signal::Skip));
//! machine.receive_context(Action::text("alice"));
//!
//! assert!(machine.is_completed());
//! assert_eq!(machine.draft().target(), Some("alice"));
//! ```

mod action;
mod context;
mod draft;
mod error;
mod machine;
mod payload;
mod preference;
mod reply;
mod settings;
pub mod states;
mod store;
mod template;

pub use action::Action;
pub use context::ConversationContext;
pub use draft::{DraftReport, ReportRecord};
pub use error::{FlowError, Result};
pub use machine::{ReplyDeps, StateMachine};
pub use payload::{Payload, PayloadCodec, Signal};
pub use preference::UserPreference;
pub use reply::{
    Button, Card, OutboundMessage, QuickReply, QuickReplyGenerator, Template, DEFAULT_SUGGESTIONS,
};
pub use settings::{FlowSettings, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
pub use states::ConversationState;
pub use store::{EmptyHistory, MediaUrls, PreferenceRepository, PrefixMediaUrls, ReportHistory};
pub use template::{localize, ReportTemplates, VIEW_MORE_TITLE};

// Re-export async_trait for collaborator implementations
pub use async_trait::async_trait;
