//! Send API request types.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MessengerError;

/// Most quick replies Messenger shows under one message.
pub const MAX_QUICK_REPLIES: usize = 13;

/// Most elements in one generic template.
pub const MAX_TEMPLATE_ELEMENTS: usize = 10;

/// Longest quick reply title Messenger accepts, in characters.
pub const MAX_QUICK_REPLY_TITLE: usize = 20;

/// A Send API request body.
#[derive(Debug, Clone, Serialize)]
pub struct SendRequest {
    pub recipient: Recipient,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<MessagePayload>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_action: Option<SenderAction>,
}

impl SendRequest {
    /// A message to a user.
    pub fn message(recipient_id: impl Into<String>, message: MessagePayload) -> Self {
        Self {
            recipient: Recipient::new(recipient_id),
            message: Some(message),
            sender_action: None,
        }
    }

    /// A sender action for a user.
    pub fn action(recipient_id: impl Into<String>, action: SenderAction) -> Self {
        Self {
            recipient: Recipient::new(recipient_id),
            message: None,
            sender_action: Some(action),
        }
    }
}

/// The user a request is addressed to.
#[derive(Debug, Clone, Serialize)]
pub struct Recipient {
    pub id: String,
}

impl Recipient {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Message content: text or an attachment, with optional quick replies.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MessagePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<OutgoingAttachment>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub quick_replies: Vec<QuickReplyButton>,
}

impl MessagePayload {
    /// A plain text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// A generic template. Elements past the platform limit are dropped.
    pub fn generic(mut elements: Vec<Element>) -> Self {
        elements.truncate(MAX_TEMPLATE_ELEMENTS);
        Self {
            attachment: Some(OutgoingAttachment::template(TemplatePayload {
                template_type: "generic".to_string(),
                elements,
            })),
            ..Default::default()
        }
    }

    /// Attach quick replies. Replies past the platform limit are dropped.
    pub fn with_quick_replies(mut self, mut quick_replies: Vec<QuickReplyButton>) -> Self {
        quick_replies.truncate(MAX_QUICK_REPLIES);
        self.quick_replies = quick_replies;
        self
    }
}

/// A quick reply chip.
#[derive(Debug, Clone, Serialize)]
pub struct QuickReplyButton {
    pub content_type: String,
    pub title: String,
    pub payload: String,
}

impl QuickReplyButton {
    /// A text chip. Long titles are cut to the platform limit.
    pub fn text(title: &str, payload: impl Into<String>) -> Self {
        Self {
            content_type: "text".to_string(),
            title: title.chars().take(MAX_QUICK_REPLY_TITLE).collect(),
            payload: payload.into(),
        }
    }
}

/// An outgoing attachment.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingAttachment {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: TemplatePayload,
}

impl OutgoingAttachment {
    fn template(payload: TemplatePayload) -> Self {
        Self {
            kind: "template".to_string(),
            payload,
        }
    }
}

/// A structured template.
#[derive(Debug, Clone, Serialize)]
pub struct TemplatePayload {
    pub template_type: String,
    pub elements: Vec<Element>,
}

/// One card of a generic template.
#[derive(Debug, Clone, Serialize)]
pub struct Element {
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<PostbackButton>,
}

/// A template button that posts its payload back to the webhook.
#[derive(Debug, Clone, Serialize)]
pub struct PostbackButton {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub payload: String,
}

impl PostbackButton {
    pub fn new(title: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            kind: "postback".to_string(),
            title: title.into(),
            payload: payload.into(),
        }
    }
}

/// Typing and read indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderAction {
    MarkSeen,
    TypingOn,
    TypingOff,
}

impl SenderAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderAction::MarkSeen => "mark_seen",
            SenderAction::TypingOn => "typing_on",
            SenderAction::TypingOff => "typing_off",
        }
    }
}

impl FromStr for SenderAction {
    type Err = MessengerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mark_seen" => Ok(SenderAction::MarkSeen),
            "typing_on" => Ok(SenderAction::TypingOn),
            "typing_off" => Ok(SenderAction::TypingOff),
            other => Err(MessengerError::InvalidSenderAction(other.to_string())),
        }
    }
}

impl std::fmt::Display for SenderAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful Send API response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendResponse {
    #[serde(default)]
    pub recipient_id: Option<String>,

    #[serde(default)]
    pub message_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_with_quick_replies() {
        let message = MessagePayload::text("Pick a tag")
            .with_quick_replies(vec![QuickReplyButton::text("sunset", "{\"text\":\"sunset\"}")]);
        let request = SendRequest::message("42", message);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "recipient": { "id": "42" },
                "message": {
                    "text": "Pick a tag",
                    "quick_replies": [
                        { "content_type": "text", "title": "sunset", "payload": "{\"text\":\"sunset\"}" }
                    ]
                }
            })
        );
    }

    #[test]
    fn test_generic_template() {
        let message = MessagePayload::generic(vec![Element {
            title: "alice 2024-06-02 07:30".to_string(),
            subtitle: Some("#sunset".to_string()),
            image_url: None,
            buttons: vec![PostbackButton::new("view more", "{}")],
        }]);

        let json = serde_json::to_value(SendRequest::message("42", message)).unwrap();
        let attachment = &json["message"]["attachment"];
        assert_eq!(attachment["type"], "template");
        assert_eq!(attachment["payload"]["template_type"], "generic");
        let element = &attachment["payload"]["elements"][0];
        assert_eq!(element["subtitle"], "#sunset");
        assert!(element.get("image_url").is_none());
        assert_eq!(element["buttons"][0]["type"], "postback");
        assert!(json["message"].get("text").is_none());
    }

    #[test]
    fn test_platform_limits() {
        let elements = (0..12)
            .map(|i| Element {
                title: i.to_string(),
                subtitle: None,
                image_url: None,
                buttons: vec![],
            })
            .collect();
        let message = MessagePayload::generic(elements);
        assert_eq!(message.attachment.unwrap().payload.elements.len(), MAX_TEMPLATE_ELEMENTS);

        let chip = QuickReplyButton::text("a very long tag name that keeps going", "{}");
        assert_eq!(chip.title.chars().count(), MAX_QUICK_REPLY_TITLE);

        let chips = (0..20).map(|i| QuickReplyButton::text(&i.to_string(), "{}")).collect();
        let message = MessagePayload::text("x").with_quick_replies(chips);
        assert_eq!(message.quick_replies.len(), MAX_QUICK_REPLIES);
    }

    #[test]
    fn test_sender_action() {
        let json = serde_json::to_value(SendRequest::action("42", SenderAction::TypingOn)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "recipient": { "id": "42" }, "sender_action": "typing_on" })
        );

        assert_eq!("mark_seen".parse::<SenderAction>().unwrap(), SenderAction::MarkSeen);
        assert_eq!(SenderAction::TypingOff.to_string(), "typing_off");
        assert!(matches!(
            "wave".parse::<SenderAction>(),
            Err(MessengerError::InvalidSenderAction(_))
        ));
    }
}
