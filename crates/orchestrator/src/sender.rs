//! Message sender trait and implementations.

use async_trait::async_trait;
use messenger::{
    Element, MessagePayload, MessengerClient, PostbackButton, QuickReplyButton, SenderAction,
};
use report_flow::{Card, OutboundMessage};

use crate::error::OrchestratorError;

/// Trait for delivering replies and sender actions.
///
/// Abstracted to support different transports (Messenger, tests, etc.)
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Deliver a reply to a user.
    async fn send_reply(
        &self,
        recipient: &str,
        reply: &OutboundMessage,
    ) -> Result<(), OrchestratorError>;

    /// Send a sender action (read receipt or typing indicator).
    async fn sender_action(
        &self,
        recipient: &str,
        action: SenderAction,
    ) -> Result<(), OrchestratorError>;

    /// Set typing indicator state.
    ///
    /// Default implementation maps to the typing sender actions.
    async fn set_typing(&self, recipient: &str, started: bool) -> Result<(), OrchestratorError> {
        let action = if started {
            SenderAction::TypingOn
        } else {
            SenderAction::TypingOff
        };
        self.sender_action(recipient, action).await
    }
}

/// Sends through the Messenger Send API.
#[derive(Debug, Clone)]
pub struct MessengerSender {
    client: MessengerClient,
}

impl MessengerSender {
    pub fn new(client: MessengerClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MessageSender for MessengerSender {
    async fn send_reply(
        &self,
        recipient: &str,
        reply: &OutboundMessage,
    ) -> Result<(), OrchestratorError> {
        self.client
            .send_message(recipient, to_payload(reply))
            .await
            .map_err(|e| OrchestratorError::SendFailed(e.to_string()))?;
        Ok(())
    }

    async fn sender_action(
        &self,
        recipient: &str,
        action: SenderAction,
    ) -> Result<(), OrchestratorError> {
        self.client
            .send_sender_action(recipient, action)
            .await
            .map_err(|e| OrchestratorError::SendFailed(e.to_string()))
    }
}

/// Convert a reply into a Send API message.
pub fn to_payload(reply: &OutboundMessage) -> MessagePayload {
    match reply {
        OutboundMessage::Text {
            text,
            quick_replies,
        } => MessagePayload::text(text.clone()).with_quick_replies(
            quick_replies
                .iter()
                .map(|q| QuickReplyButton::text(&q.title, q.payload.clone()))
                .collect(),
        ),
        OutboundMessage::Template { template } => {
            MessagePayload::generic(template.cards().iter().map(element).collect())
        }
    }
}

fn element(card: &Card) -> Element {
    Element {
        title: card.title.clone(),
        subtitle: card.subtitle.clone(),
        image_url: card.image_url.clone(),
        buttons: card
            .buttons
            .iter()
            .map(|b| PostbackButton::new(b.title.clone(), b.payload.clone()))
            .collect(),
    }
}

/// A no-op message sender for testing that discards all messages.
#[derive(Debug, Clone, Default)]
pub struct NoOpSender;

#[async_trait]
impl MessageSender for NoOpSender {
    async fn send_reply(
        &self,
        _recipient: &str,
        _reply: &OutboundMessage,
    ) -> Result<(), OrchestratorError> {
        Ok(())
    }

    async fn sender_action(
        &self,
        _recipient: &str,
        _action: SenderAction,
    ) -> Result<(), OrchestratorError> {
        Ok(())
    }
}
