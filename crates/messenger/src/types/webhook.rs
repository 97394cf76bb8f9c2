//! Webhook delivery types.
//!
//! Messenger posts `{"object": "page", "entry": [{"messaging": [..]}]}`.
//! Every messaging item carries exactly one of `message`, `postback`,
//! `delivery`, `read` or `optin`.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Object type of deliveries for a page subscription.
pub const PAGE_OBJECT: &str = "page";

/// A webhook delivery body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub object: String,

    #[serde(default)]
    pub entry: Vec<Entry>,
}

impl WebhookBody {
    /// Extract the events the bot responds to, in delivery order.
    ///
    /// Bodies for anything other than a page subscription yield nothing.
    pub fn events(&self) -> Vec<InboundEvent> {
        if self.object != PAGE_OBJECT {
            debug!("Ignoring webhook object: {}", self.object);
            return Vec::new();
        }

        self.entry
            .iter()
            .flat_map(|entry| entry.messaging.iter())
            .filter_map(|messaging| {
                let event = messaging.to_event();
                if event.is_none() {
                    debug!("Ignoring messaging item: {:?}", messaging.kind());
                }
                event
            })
            .collect()
    }
}

/// One page entry in a delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// Page ID.
    #[serde(default)]
    pub id: Option<String>,

    /// Delivery time (milliseconds since epoch).
    #[serde(default)]
    pub time: Option<i64>,

    #[serde(default)]
    pub messaging: Vec<Messaging>,
}

/// A user or page reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Party {
    pub id: String,
}

/// One messaging item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Messaging {
    #[serde(default)]
    pub sender: Party,

    #[serde(default)]
    pub recipient: Option<Party>,

    /// Event time (milliseconds since epoch).
    #[serde(default)]
    pub timestamp: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postback: Option<Postback>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optin: Option<serde_json::Value>,
}

/// What a messaging item is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagingKind {
    Delivery,
    Read,
    Postback,
    Optin,
    /// A message the page itself sent.
    Echo,
    Message,
    Unknown,
}

impl Messaging {
    /// Classify this item.
    pub fn kind(&self) -> MessagingKind {
        if self.delivery.is_some() {
            MessagingKind::Delivery
        } else if self.read.is_some() {
            MessagingKind::Read
        } else if self.postback.is_some() {
            MessagingKind::Postback
        } else if self.optin.is_some() {
            MessagingKind::Optin
        } else if let Some(message) = &self.message {
            if message.is_echo {
                MessagingKind::Echo
            } else {
                MessagingKind::Message
            }
        } else {
            MessagingKind::Unknown
        }
    }

    /// Convert a user message or postback into an [`InboundEvent`].
    ///
    /// Returns `None` for every other kind, and for messages carrying no
    /// quick reply, text or attachments.
    pub fn to_event(&self) -> Option<InboundEvent> {
        if self.sender.id.is_empty() {
            return None;
        }

        let (mid, kind) = match self.kind() {
            MessagingKind::Message => {
                let message = self.message.as_ref()?;
                (message.mid.clone(), message.event_kind()?)
            }
            MessagingKind::Postback => {
                let postback = self.postback.as_ref()?;
                (
                    postback.mid.clone(),
                    EventKind::Postback(postback.payload.clone()),
                )
            }
            _ => return None,
        };

        // Postbacks from older API versions carry no message ID
        let mid = mid.or_else(|| {
            self.timestamp
                .map(|timestamp| format!("{}.{}", self.sender.id, timestamp))
        });

        Some(InboundEvent {
            sender_id: self.sender.id.clone(),
            mid,
            timestamp: self.timestamp,
            kind,
            raw: serde_json::to_string(self).unwrap_or_default(),
        })
    }
}

/// A message sent by a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub mid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_reply: Option<QuickReplyContent>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,

    #[serde(default)]
    pub is_echo: bool,
}

impl Message {
    /// Quick replies also carry their title as text, so they are checked first.
    fn event_kind(&self) -> Option<EventKind> {
        if let Some(quick_reply) = &self.quick_reply {
            Some(EventKind::QuickReply(quick_reply.payload.clone()))
        } else if let Some(text) = &self.text {
            Some(EventKind::Text(text.clone()))
        } else if !self.attachments.is_empty() {
            Some(EventKind::Attachments(self.attachments.clone()))
        } else {
            None
        }
    }
}

/// The payload of a tapped quick reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuickReplyContent {
    #[serde(default)]
    pub payload: String,
}

/// A postback from a tapped template button.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Postback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default)]
    pub payload: String,
}

/// A file attached to a user message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// `image`, `video`, `audio`, `file`, `location` or `fallback`.
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<AttachmentPayload>,
}

impl Attachment {
    /// Whether this is an image or a video.
    pub fn is_media(&self) -> bool {
        matches!(self.kind.as_str(), "image" | "video")
    }

    /// The download URL, if any.
    pub fn url(&self) -> Option<&str> {
        self.payload.as_ref()?.url.as_deref()
    }

    /// The last path segment of the download URL.
    pub fn file_name(&self) -> Option<String> {
        let url = reqwest::Url::parse(self.url()?).ok()?;
        url.path_segments()?
            .next_back()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

/// Attachment payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// An inbound user action the bot replies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Page-scoped ID of the user.
    pub sender_id: String,
    /// Message ID. Postbacks that lack one get `"{sender}.{timestamp}"`;
    /// `None` when the timestamp is missing too.
    pub mid: Option<String>,
    /// Event time (milliseconds since epoch).
    pub timestamp: Option<i64>,
    pub kind: EventKind,
    /// The messaging item as JSON, for the message log.
    pub raw: String,
}

impl InboundEvent {
    /// The message ID for log lines.
    pub fn log_id(&self) -> &str {
        self.mid.as_deref().unwrap_or("-")
    }
}

/// The content of an [`InboundEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Payload of a tapped quick reply.
    QuickReply(String),
    /// Free text.
    Text(String),
    /// Uploaded files.
    Attachments(Vec<Attachment>),
    /// Payload of a tapped template button.
    Postback(String),
}

/// Query parameters of the subscription handshake.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode", default)]
    pub mode: String,

    #[serde(rename = "hub.verify_token", default)]
    pub verify_token: String,

    #[serde(rename = "hub.challenge", default)]
    pub challenge: String,
}

impl VerifyParams {
    /// The challenge to echo back, if this is a subscribe request carrying
    /// the expected token.
    pub fn challenge_for(&self, verify_token: &str) -> Option<&str> {
        (self.mode == "subscribe" && !verify_token.is_empty() && self.verify_token == verify_token)
            .then_some(self.challenge.as_str())
    }
}
