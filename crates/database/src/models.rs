//! Database models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::Result;

/// Per-user conversation state, as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ConversationRecord {
    /// Messenger page-scoped user ID.
    pub user_id: String,
    /// Conversation context JSON object.
    pub context: String,
    /// Draft report JSON object.
    pub draft: String,
    /// First contact timestamp.
    pub created_on: String,
    /// Last save timestamp.
    pub last_modified: String,
}

impl ConversationRecord {
    pub fn context_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.context).unwrap_or_else(|_| serde_json::json!({}))
    }

    pub fn draft_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.draft).unwrap_or_else(|_| serde_json::json!({}))
    }
}

/// Stored suggestion lists for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PreferenceRecord {
    pub user_id: String,
    /// JSON array of tags, most recent first.
    pub tags: String,
    /// JSON array of targets, most recent first.
    pub targets: String,
    /// Last update timestamp.
    pub updated_at: String,
}

impl PreferenceRecord {
    pub fn tag_list(&self) -> Result<Vec<String>> {
        Ok(serde_json::from_str(&self.tags)?)
    }

    pub fn target_list(&self) -> Result<Vec<String>> {
        Ok(serde_json::from_str(&self.targets)?)
    }
}

/// A completed report row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ReportRow {
    pub id: i64,
    pub user_id: String,
    /// JSON array of tags.
    pub tags: String,
    /// JSON array of media keys.
    pub images: String,
    pub target: Option<String>,
    /// RFC 3339 UTC, see [`crate::timestamp`].
    pub timestamp: String,
}

impl ReportRow {
    pub fn tag_list(&self) -> Result<Vec<String>> {
        Ok(serde_json::from_str(&self.tags)?)
    }

    pub fn image_list(&self) -> Result<Vec<String>> {
        Ok(serde_json::from_str(&self.images)?)
    }
}

/// A logged inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MessageLogEntry {
    pub id: i64,
    pub user_id: String,
    /// Messenger message ID.
    pub mid: String,
    /// Raw message JSON.
    pub raw: String,
    /// Receipt timestamp.
    pub timestamp: String,
    /// Set once the turn for this message finished.
    pub processed_timestamp: Option<String>,
    /// JSON array of stored attachment keys.
    pub attachments: Option<String>,
}

/// A logged outbound reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ReplyLogEntry {
    pub id: i64,
    pub user_id: String,
    /// Reply JSON.
    pub body: String,
    pub timestamp: String,
}
