//! In-memory stores for tests and local runs.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use messenger::Attachment;
use report_flow::{
    MediaUrls, OutboundMessage, PreferenceRepository, PrefixMediaUrls, ReportHistory, ReportRecord,
    Result, UserPreference,
};
use tokio::sync::RwLock;

use crate::error::OrchestratorError;
use crate::media::{media_key, MediaStore};
use crate::store::{ConversationStore, MessageLog, ReportSink};

/// An inbound message as logged by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedMessage {
    pub user_id: String,
    pub raw: String,
    pub processed: bool,
    pub attachments: Vec<String>,
}

/// Store keeping everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    conversations: RwLock<HashMap<String, (serde_json::Value, serde_json::Value)>>,
    preferences: RwLock<HashMap<String, UserPreference>>,
    reports: RwLock<Vec<ReportRecord>>,
    messages: RwLock<HashMap<String, LoggedMessage>>,
    replies: RwLock<Vec<(String, OutboundMessage)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored reports, in insertion order.
    pub async fn reports(&self) -> Vec<ReportRecord> {
        self.reports.read().await.clone()
    }

    /// The raw persisted context of a user, if any.
    pub async fn context_of(&self, user_id: &str) -> Option<serde_json::Value> {
        self.conversations
            .read()
            .await
            .get(user_id)
            .map(|(context, _)| context.clone())
    }

    /// The raw persisted draft of a user, if any.
    pub async fn draft_of(&self, user_id: &str) -> Option<serde_json::Value> {
        self.conversations
            .read()
            .await
            .get(user_id)
            .map(|(_, draft)| draft.clone())
    }

    /// A logged inbound message.
    pub async fn message(&self, mid: &str) -> Option<LoggedMessage> {
        self.messages.read().await.get(mid).cloned()
    }

    /// Replies logged for a user, oldest first.
    pub async fn replies_for(&self, user_id: &str) -> Vec<OutboundMessage> {
        self.replies
            .read()
            .await
            .iter()
            .filter(|(id, _)| id == user_id)
            .map(|(_, reply)| reply.clone())
            .collect()
    }
}

fn empty_blob() -> serde_json::Value {
    serde_json::json!({})
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn load_conversation(
        &self,
        user_id: &str,
    ) -> Result<(serde_json::Value, serde_json::Value)> {
        let mut conversations = self.conversations.write().await;
        Ok(conversations
            .entry(user_id.to_string())
            .or_insert_with(|| (empty_blob(), empty_blob()))
            .clone())
    }

    async fn save_conversation(
        &self,
        user_id: &str,
        context: &serde_json::Value,
        draft: &serde_json::Value,
    ) -> Result<()> {
        self.conversations
            .write()
            .await
            .insert(user_id.to_string(), (context.clone(), draft.clone()));
        Ok(())
    }

    async fn clear_conversation(&self, user_id: &str) -> Result<()> {
        self.conversations
            .write()
            .await
            .insert(user_id.to_string(), (empty_blob(), empty_blob()));
        Ok(())
    }
}

#[async_trait]
impl ReportHistory for MemoryStore {
    async fn load(
        &self,
        user_id: &str,
        cursor: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ReportRecord>> {
        let mut page: Vec<ReportRecord> = self
            .reports
            .read()
            .await
            .iter()
            .filter(|r| r.user_id == user_id && r.timestamp <= cursor)
            .cloned()
            .collect();
        page.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        page.truncate(limit);
        Ok(page)
    }
}

#[async_trait]
impl ReportSink for MemoryStore {
    async fn insert_report(&self, report: &ReportRecord) -> Result<()> {
        self.reports.write().await.push(report.clone());
        Ok(())
    }
}

#[async_trait]
impl PreferenceRepository for MemoryStore {
    async fn read(&self, user_id: &str) -> Result<UserPreference> {
        Ok(self
            .preferences
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn write(&self, user_id: &str, preference: &UserPreference) -> Result<()> {
        self.preferences
            .write()
            .await
            .insert(user_id.to_string(), preference.clone());
        Ok(())
    }
}

#[async_trait]
impl MessageLog for MemoryStore {
    async fn log_message(&self, user_id: &str, mid: &str, raw: &str) -> Result<bool> {
        let mut messages = self.messages.write().await;
        if let Some(message) = messages.get(mid) {
            return Ok(!message.processed);
        }
        messages.insert(
            mid.to_string(),
            LoggedMessage {
                user_id: user_id.to_string(),
                raw: raw.to_string(),
                processed: false,
                attachments: Vec::new(),
            },
        );
        Ok(true)
    }

    async fn mark_processed(&self, mid: &str, saved_attachments: &[String]) -> Result<()> {
        if let Some(message) = self.messages.write().await.get_mut(mid) {
            message.processed = true;
            message.attachments = saved_attachments.to_vec();
        }
        Ok(())
    }

    async fn log_reply(&self, user_id: &str, reply: &OutboundMessage) -> Result<()> {
        self.replies
            .write()
            .await
            .push((user_id.to_string(), reply.clone()));
        Ok(())
    }
}

/// Media store that records keys without downloading anything.
#[derive(Debug)]
pub struct MemoryMediaStore {
    urls: PrefixMediaUrls,
    saved: RwLock<Vec<String>>,
}

impl MemoryMediaStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            urls: PrefixMediaUrls::new(base_url),
            saved: RwLock::new(Vec::new()),
        }
    }

    /// Keys saved so far.
    pub async fn saved(&self) -> Vec<String> {
        self.saved.read().await.clone()
    }
}

impl MediaUrls for MemoryMediaStore {
    fn url_for(&self, key: &str) -> String {
        self.urls.url_for(key)
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn save(
        &self,
        user_id: &str,
        attachment: &Attachment,
    ) -> std::result::Result<String, OrchestratorError> {
        let key = media_key(user_id, attachment)?;
        self.saved.write().await.push(key.clone());
        Ok(key)
    }
}
