//! Outbound message model and quick-reply suggestions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::payload::{Payload, PayloadCodec, Signal};
use crate::preference::UserPreference;

/// Default number of preference suggestions offered per reply.
pub const DEFAULT_SUGGESTIONS: usize = 3;

/// A message the bot sends back to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Plain text, optionally followed by quick-reply chips.
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        quick_replies: Vec<QuickReply>,
    },
    /// A structured template (report cards).
    Template { template: Template },
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            quick_replies: Vec::new(),
        }
    }

    pub fn text_with_replies(text: impl Into<String>, quick_replies: Vec<QuickReply>) -> Self {
        Self::Text {
            text: text.into(),
            quick_replies,
        }
    }

    /// Text body, if this is a text message.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } => Some(text),
            Self::Template { .. } => None,
        }
    }

    /// Quick replies attached to a text message.
    pub fn quick_replies(&self) -> &[QuickReply] {
        match self {
            Self::Text { quick_replies, .. } => quick_replies,
            Self::Template { .. } => &[],
        }
    }
}

/// A tappable chip under a text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickReply {
    pub title: String,
    /// Encoded [`Payload`].
    pub payload: String,
}

impl QuickReply {
    pub fn new(title: impl Into<String>, payload: &Payload) -> Self {
        Self {
            title: title.into(),
            payload: PayloadCodec::encode(payload),
        }
    }

    pub fn decoded_payload(&self) -> Payload {
        PayloadCodec::decode(&self.payload)
    }
}

/// Card-based templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Template {
    /// A horizontally scrolling list of report cards.
    Carousel { cards: Vec<Card> },
    /// A single report shown on its own.
    Detail { card: Card },
}

impl Template {
    pub fn cards(&self) -> &[Card] {
        match self {
            Self::Carousel { cards } => cards,
            Self::Detail { card } => std::slice::from_ref(card),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
}

/// A postback button on a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub title: String,
    /// Encoded [`Payload`].
    pub payload: String,
}

impl Button {
    pub fn postback(title: impl Into<String>, payload: &Payload) -> Self {
        Self {
            title: title.into(),
            payload: PayloadCodec::encode(payload),
        }
    }
}

/// Builds quick-reply chips from a user's preference.
pub struct QuickReplyGenerator<'a> {
    preference: &'a UserPreference,
}

impl<'a> QuickReplyGenerator<'a> {
    pub fn new(preference: &'a UserPreference) -> Self {
        Self { preference }
    }

    /// Up to `size` recently used tags not in `excludes`, then an optional
    /// skip chip.
    pub fn tags<S: AsRef<str>>(
        &self,
        excludes: &[S],
        size: usize,
        with_skip: bool,
    ) -> Vec<QuickReply> {
        suggest(&self.preference.tags, excludes, size, with_skip)
    }

    /// Up to `size` recently used targets not in `excludes`, then an
    /// optional skip chip.
    pub fn targets<S: AsRef<str>>(
        &self,
        excludes: &[S],
        size: usize,
        with_skip: bool,
    ) -> Vec<QuickReply> {
        suggest(&self.preference.targets, excludes, size, with_skip)
    }

    pub fn skip() -> QuickReply {
        QuickReply::new("skip", &Payload::signal(Signal::Skip))
    }

    pub fn cancel() -> QuickReply {
        QuickReply::new("cancel", &Payload::signal(Signal::Cancel))
    }

    /// The main menu: start a report, or browse reports up to `now`.
    pub fn menu(now: DateTime<Utc>) -> Vec<QuickReply> {
        vec![
            QuickReply::new("new report", &Payload::signal(Signal::InsertNew)),
            QuickReply::new("recent reports", &Payload::recent_report(now)),
        ]
    }
}

fn suggest<S: AsRef<str>>(
    candidates: &[String],
    excludes: &[S],
    size: usize,
    with_skip: bool,
) -> Vec<QuickReply> {
    let excludes: Vec<String> = excludes.iter().map(|e| e.as_ref().to_lowercase()).collect();

    let mut replies: Vec<QuickReply> = candidates
        .iter()
        .filter(|c| !excludes.contains(&c.to_lowercase()))
        .take(size)
        .map(|c| QuickReply::new(c.as_str(), &Payload::text(c.as_str())))
        .collect();

    if with_skip {
        replies.push(QuickReplyGenerator::skip());
    }
    replies
}
