//! Structured payloads carried by quick replies and postback buttons.
//!
//! A payload is a small JSON object with one of three shapes:
//!
//! ```text
//! {"signal": "SKIP"}
//! {"text": "sunset"}
//! {"signal": "RECENT_REPORT", "start_timestamp": "2024-05-01T10:00:00Z"}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Control codes sent back by quick replies and postbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    /// Start composing a new report.
    InsertNew,
    /// Browse past reports, starting at a cursor.
    RecentReport,
    /// Skip the optional step of the current state.
    Skip,
    /// Abandon the report being composed.
    Cancel,
    /// A signal this build does not know. Decodes fine, matches nothing.
    #[serde(other)]
    Unknown,
}

impl Signal {
    /// Wire name of the signal.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsertNew => "INSERT_NEW",
            Self::RecentReport => "RECENT_REPORT",
            Self::Skip => "SKIP",
            Self::Cancel => "CANCEL",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Decoded contents of a quick reply or postback payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<Signal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<DateTime<Utc>>,
}

impl Payload {
    /// A bare control signal.
    pub fn signal(signal: Signal) -> Self {
        Self {
            signal: Some(signal),
            ..Default::default()
        }
    }

    /// A canned text answer, handled exactly like typed text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// A request for the report page starting at `cursor`.
    pub fn recent_report(cursor: DateTime<Utc>) -> Self {
        Self {
            signal: Some(Signal::RecentReport),
            text: None,
            start_timestamp: Some(cursor),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.signal.is_none() && self.text.is_none() && self.start_timestamp.is_none()
    }
}

/// Encoder/decoder for payload strings.
pub struct PayloadCodec;

impl PayloadCodec {
    /// Serialize a payload for embedding in a quick reply or button.
    pub fn encode(payload: &Payload) -> String {
        // Only string, enum and timestamp fields; serialization cannot fail.
        serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string())
    }

    /// Parse a payload string.
    ///
    /// Anything that is not a well-formed payload object decodes to an empty
    /// payload, which the state machine treats as a no-op turn.
    pub fn decode(raw: &str) -> Payload {
        match serde_json::from_str::<Payload>(raw) {
            Ok(payload) => payload,
            Err(err) => {
                debug!("Ignoring malformed payload {:?}: {}", raw, err);
                Payload::default()
            }
        }
    }
}
