//! The per-turn action record fed into the state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::payload::{Payload, Signal};

/// Everything one inbound event contributes to a turn.
///
/// Built by the orchestrator from typed text, a decoded payload, or stored
/// attachments. Empty fields mean "not present".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<Signal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<DateTime<Utc>>,
}

impl Action {
    /// An action carrying nothing. Re-renders the current state.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Typed text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Stored attachment keys.
    pub fn images(images: Vec<String>) -> Self {
        Self {
            images,
            ..Default::default()
        }
    }

    /// A bare signal.
    pub fn signal(signal: Signal) -> Self {
        Self {
            signal: Some(signal),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.images.is_empty()
            && self.signal.is_none()
            && self.start_timestamp.is_none()
    }
}

impl From<Payload> for Action {
    fn from(payload: Payload) -> Self {
        Self {
            text: payload.text,
            images: Vec::new(),
            signal: payload.signal,
            start_timestamp: payload.start_timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::PayloadCodec;

    #[test]
    fn test_from_payload() {
        let action = Action::from(PayloadCodec::decode(r#"{"text":"beach"}"#));
        assert_eq!(action, Action::text("beach"));
    }

    #[test]
    fn test_malformed_payload_is_empty_action() {
        let action = Action::from(PayloadCodec::decode("not json"));
        assert!(action.is_empty());
    }
}
