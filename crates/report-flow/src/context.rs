//! Per-user conversation context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::payload::Signal;

/// The conversation context of one user.
///
/// Only `state_code` is persisted. The remaining slots hold the current
/// turn's input and are consumed by the state that handles them; whatever is
/// left unconsumed at the end of the turn is dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state_code: Option<String>,

    #[serde(skip)]
    text: Option<String>,

    #[serde(skip)]
    images: Vec<String>,

    #[serde(skip)]
    signal: Option<Signal>,

    #[serde(skip)]
    cursor: Option<DateTime<Utc>>,
}

impl ConversationContext {
    /// A context with no state yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a context from its persisted JSON form.
    ///
    /// A missing or unreadable blob is treated as a brand new conversation.
    pub fn from_blob(blob: &serde_json::Value) -> Self {
        serde_json::from_value(blob.clone()).unwrap_or_default()
    }

    /// The persisted JSON form.
    pub fn to_blob(&self) -> serde_json::Value {
        match &self.state_code {
            Some(code) => serde_json::json!({ "state_code": code }),
            None => serde_json::json!({}),
        }
    }

    pub fn state_code(&self) -> Option<&str> {
        self.state_code.as_deref()
    }

    pub(crate) fn set_state_code(&mut self, code: &str) {
        self.state_code = Some(code.to_string());
    }

    /// Merge one turn's action into the transient slots.
    pub fn merge(&mut self, action: Action) {
        if action.text.is_some() {
            self.text = action.text;
        }
        if !action.images.is_empty() {
            self.images.extend(action.images);
        }
        if action.signal.is_some() {
            self.signal = action.signal;
        }
        if action.start_timestamp.is_some() {
            self.cursor = action.start_timestamp;
        }
    }

    pub fn signal(&self) -> Option<Signal> {
        self.signal
    }

    pub fn cursor(&self) -> Option<DateTime<Utc>> {
        self.cursor
    }

    /// Non-empty text is waiting to be handled.
    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }

    /// Consume the text slot. Empty text counts as absent.
    pub fn take_text(&mut self) -> Option<String> {
        self.text.take().filter(|t| !t.is_empty())
    }

    pub fn take_images(&mut self) -> Vec<String> {
        std::mem::take(&mut self.images)
    }

    pub fn take_signal(&mut self) -> Option<Signal> {
        self.signal.take()
    }

    pub fn take_cursor(&mut self) -> Option<DateTime<Utc>> {
        self.cursor.take()
    }

    /// Drop every transient slot.
    pub fn clear_transient(&mut self) {
        self.text = None;
        self.images.clear();
        self.signal = None;
        self.cursor = None;
    }

    /// Whether any transient slot still holds input.
    pub fn has_transient(&self) -> bool {
        self.text.is_some()
            || !self.images.is_empty()
            || self.signal.is_some()
            || self.cursor.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_blob_round_trip_keeps_only_state_code() {
        let mut ctx = ConversationContext::new();
        ctx.set_state_code("TAG_ADDED");
        ctx.merge(Action::text("beach"));

        let blob = ctx.to_blob();
        assert_eq!(blob, serde_json::json!({ "state_code": "TAG_ADDED" }));

        let restored = ConversationContext::from_blob(&blob);
        assert_eq!(restored.state_code(), Some("TAG_ADDED"));
        assert!(!restored.has_transient());
    }

    #[test]
    fn test_from_blob_ignores_legacy_transient_keys() {
        let blob = serde_json::json!({
            "state_code": "IMG_UPLOADED",
            "text": "left over",
            "images": ["a.jpg"]
        });
        let ctx = ConversationContext::from_blob(&blob);
        assert_eq!(ctx.state_code(), Some("IMG_UPLOADED"));
        assert!(!ctx.has_text());
        assert!(!ctx.has_images());
    }

    #[test]
    fn test_from_blob_garbage() {
        let ctx = ConversationContext::from_blob(&serde_json::json!("nope"));
        assert_eq!(ctx.state_code(), None);
    }

    #[test]
    fn test_take_consumes() {
        let mut ctx = ConversationContext::new();
        ctx.merge(Action::text("sunset"));
        assert!(ctx.has_text());
        assert_eq!(ctx.take_text().as_deref(), Some("sunset"));
        assert!(!ctx.has_text());
        assert_eq!(ctx.take_text(), None);
    }

    #[test]
    fn test_empty_text_is_absent() {
        let mut ctx = ConversationContext::new();
        ctx.merge(Action::text(""));
        assert!(!ctx.has_text());
        assert_eq!(ctx.take_text(), None);
    }

    #[test]
    fn test_merge_cursor() {
        let cursor = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let mut ctx = ConversationContext::new();
        ctx.merge(Action {
            signal: Some(Signal::RecentReport),
            start_timestamp: Some(cursor),
            ..Default::default()
        });
        assert_eq!(ctx.signal(), Some(Signal::RecentReport));
        assert_eq!(ctx.take_cursor(), Some(cursor));
        ctx.clear_transient();
        assert!(!ctx.has_transient());
    }
}
