//! Persistence seams used by the orchestrator, and their SQLite backing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use database::{conversation, message_log, preference, reply_log, report, timestamp, Database};
use report_flow::{
    FlowError, OutboundMessage, PreferenceRepository, ReportHistory, ReportRecord, Result,
    UserPreference,
};
use tracing::debug;

use crate::error::OrchestratorError;

/// Per-user conversation record: the context and draft blobs.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Load a user's context and draft, creating an empty record on first
    /// contact.
    async fn load_conversation(
        &self,
        user_id: &str,
    ) -> Result<(serde_json::Value, serde_json::Value)>;

    /// Persist a user's context and draft.
    async fn save_conversation(
        &self,
        user_id: &str,
        context: &serde_json::Value,
        draft: &serde_json::Value,
    ) -> Result<()>;

    /// Reset a user's context and draft.
    async fn clear_conversation(&self, user_id: &str) -> Result<()>;
}

/// Write access to completed reports.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn insert_report(&self, report: &ReportRecord) -> Result<()>;
}

/// Inbound and outbound message logs.
#[async_trait]
pub trait MessageLog: Send + Sync {
    /// Log a raw inbound message. Returns `false` if the message ID was
    /// already processed; a message logged by a turn that did not finish
    /// returns `true` again.
    async fn log_message(&self, user_id: &str, mid: &str, raw: &str) -> Result<bool>;

    /// Mark an inbound message processed with the media keys stored for it.
    async fn mark_processed(&self, mid: &str, saved_attachments: &[String]) -> Result<()>;

    /// Log a delivered reply.
    async fn log_reply(&self, user_id: &str, reply: &OutboundMessage) -> Result<()>;
}

/// Everything a turn reads and writes.
pub trait Store:
    ConversationStore + ReportHistory + ReportSink + PreferenceRepository + MessageLog
{
}

impl<T> Store for T where
    T: ConversationStore + ReportHistory + ReportSink + PreferenceRepository + MessageLog
{
}

fn store_error(err: database::DatabaseError) -> FlowError {
    FlowError::Store(err.to_string())
}

/// SQLite-backed store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    database: Database,
}

impl SqliteStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Connect to `url` and run migrations.
    pub async fn open(url: &str) -> std::result::Result<Self, OrchestratorError> {
        let database = Database::connect(url).await?;
        database.migrate().await?;
        Ok(Self::new(database))
    }

    pub fn database(&self) -> &Database {
        &self.database
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn load_conversation(
        &self,
        user_id: &str,
    ) -> Result<(serde_json::Value, serde_json::Value)> {
        let record = conversation::get_or_create(self.database.pool(), user_id)
            .await
            .map_err(store_error)?;
        Ok((record.context_json(), record.draft_json()))
    }

    async fn save_conversation(
        &self,
        user_id: &str,
        context: &serde_json::Value,
        draft: &serde_json::Value,
    ) -> Result<()> {
        conversation::save_conversation(self.database.pool(), user_id, context, draft)
            .await
            .map_err(store_error)
    }

    async fn clear_conversation(&self, user_id: &str) -> Result<()> {
        conversation::clear_conversation(self.database.pool(), user_id)
            .await
            .map_err(store_error)
    }
}

#[async_trait]
impl ReportHistory for SqliteStore {
    async fn load(
        &self,
        user_id: &str,
        cursor: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ReportRecord>> {
        let history_error = |e: database::DatabaseError| FlowError::History(e.to_string());
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = report::load_page(self.database.pool(), user_id, cursor, limit)
            .await
            .map_err(history_error)?;
        debug!("Loaded {} reports for {}", rows.len(), user_id);

        rows.into_iter()
            .map(|row| {
                Ok(ReportRecord {
                    tags: row.tag_list().map_err(history_error)?,
                    images: row.image_list().map_err(history_error)?,
                    timestamp: timestamp::parse_timestamp(&row.timestamp)
                        .map_err(history_error)?,
                    target: row.target,
                    user_id: row.user_id,
                })
            })
            .collect()
    }
}

#[async_trait]
impl ReportSink for SqliteStore {
    async fn insert_report(&self, record: &ReportRecord) -> Result<()> {
        let id = report::insert_report(
            self.database.pool(),
            &record.user_id,
            &record.tags,
            &record.images,
            record.target.as_deref(),
            record.timestamp,
        )
        .await
        .map_err(store_error)?;
        debug!("Inserted report {} for {}", id, record.user_id);
        Ok(())
    }
}

#[async_trait]
impl PreferenceRepository for SqliteStore {
    async fn read(&self, user_id: &str) -> Result<UserPreference> {
        let preference_error = |e: database::DatabaseError| FlowError::Preference(e.to_string());

        match preference::get_preference(self.database.pool(), user_id)
            .await
            .map_err(preference_error)?
        {
            Some(record) => Ok(UserPreference::new(
                record.tag_list().map_err(preference_error)?,
                record.target_list().map_err(preference_error)?,
            )),
            None => Ok(UserPreference::default()),
        }
    }

    async fn write(&self, user_id: &str, preference: &UserPreference) -> Result<()> {
        preference::upsert_preference(
            self.database.pool(),
            user_id,
            &preference.tags,
            &preference.targets,
        )
        .await
        .map_err(|e| FlowError::Preference(e.to_string()))
    }
}

#[async_trait]
impl MessageLog for SqliteStore {
    async fn log_message(&self, user_id: &str, mid: &str, raw: &str) -> Result<bool> {
        let pool = self.database.pool();
        if message_log::put_message(pool, user_id, mid, raw)
            .await
            .map_err(store_error)?
        {
            return Ok(true);
        }
        let logged = message_log::get_message(pool, mid)
            .await
            .map_err(store_error)?;
        Ok(logged.processed_timestamp.is_none())
    }

    async fn mark_processed(&self, mid: &str, saved_attachments: &[String]) -> Result<()> {
        message_log::mark_processed(self.database.pool(), mid, saved_attachments)
            .await
            .map_err(store_error)
    }

    async fn log_reply(&self, user_id: &str, reply: &OutboundMessage) -> Result<()> {
        let body = serde_json::to_value(reply).map_err(|e| FlowError::Store(e.to_string()))?;
        reply_log::put_reply(self.database.pool(), user_id, &body)
            .await
            .map_err(store_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    async fn test_store() -> SqliteStore {
        let database = Database::connect_with_pool_size("sqlite::memory:", 1)
            .await
            .unwrap();
        database.migrate().await.unwrap();
        SqliteStore::new(database)
    }

    fn record(minutes: i64, target: Option<&str>) -> ReportRecord {
        ReportRecord {
            user_id: "u1".to_string(),
            tags: vec!["sunset".to_string()],
            images: vec![format!("saved_attachments/u1/{}.jpg", minutes)],
            target: target.map(str::to_string),
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
                + Duration::minutes(minutes),
        }
    }

    #[tokio::test]
    async fn test_conversation_round_trip() {
        let store = test_store().await;

        let (context, draft) = store.load_conversation("u1").await.unwrap();
        assert_eq!(context, serde_json::json!({}));
        assert_eq!(draft, serde_json::json!({}));

        let context = serde_json::json!({ "state_code": "IMG_UPLOADED" });
        let draft = serde_json::json!({ "tags": [], "images": ["a.jpg"] });
        store.save_conversation("u1", &context, &draft).await.unwrap();
        assert_eq!(store.load_conversation("u1").await.unwrap(), (context, draft));

        store.clear_conversation("u1").await.unwrap();
        let (context, _) = store.load_conversation("u1").await.unwrap();
        assert_eq!(context, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_reports_round_trip() {
        let store = test_store().await;
        store.insert_report(&record(0, Some("alice"))).await.unwrap();
        store.insert_report(&record(1, None)).await.unwrap();

        let cursor = Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap();
        let loaded = store.load("u1", cursor, 10).await.unwrap();
        assert_eq!(loaded, vec![record(1, None), record(0, Some("alice"))]);

        assert!(store.load("u2", cursor, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_preference_round_trip() {
        let store = test_store().await;
        assert_eq!(store.read("u1").await.unwrap(), UserPreference::default());

        let preference = UserPreference::new(
            vec!["beach".to_string(), "ocean".to_string()],
            vec!["alice".to_string()],
        );
        store.write("u1", &preference).await.unwrap();
        assert_eq!(store.read("u1").await.unwrap(), preference);
    }

    #[tokio::test]
    async fn test_message_logs() {
        let store = test_store().await;

        assert!(store.log_message("u1", "mid.1", "{}").await.unwrap());
        // Not processed yet, so a redelivery runs again
        assert!(store.log_message("u1", "mid.1", "{}").await.unwrap());
        store.mark_processed("mid.1", &[]).await.unwrap();
        assert!(!store.log_message("u1", "mid.1", "{}").await.unwrap());
        assert!(store.mark_processed("mid.2", &[]).await.is_err());

        store
            .log_reply("u1", &OutboundMessage::text("hi"))
            .await
            .unwrap();
        let replies = reply_log::list_replies(store.database().pool(), "u1", 10)
            .await
            .unwrap();
        assert_eq!(replies.len(), 1);
    }
}
