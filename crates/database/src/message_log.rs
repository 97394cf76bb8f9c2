//! Inbound message log.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::MessageLogEntry;
use crate::timestamp;

/// Log a raw inbound message. A message ID seen before is ignored, so
/// redelivered webhooks are logged once.
///
/// Returns `true` if the message was new.
pub async fn put_message(pool: &SqlitePool, user_id: &str, mid: &str, raw: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO messages (user_id, mid, raw, timestamp)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(mid)
    .bind(raw)
    .bind(timestamp::now())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Get a logged message by its Messenger message ID.
pub async fn get_message(pool: &SqlitePool, mid: &str) -> Result<MessageLogEntry> {
    sqlx::query_as::<_, MessageLogEntry>(
        r#"
        SELECT id, user_id, mid, raw, timestamp, processed_timestamp, attachments
        FROM messages
        WHERE mid = ?
        "#,
    )
    .bind(mid)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Message",
        id: mid.to_string(),
    })
}

/// Mark a message processed, recording the attachments stored for it.
pub async fn mark_processed(
    pool: &SqlitePool,
    mid: &str,
    saved_attachments: &[String],
) -> Result<()> {
    let attachments = if saved_attachments.is_empty() {
        None
    } else {
        Some(serde_json::to_string(saved_attachments)?)
    };

    let result = sqlx::query(
        r#"
        UPDATE messages
        SET processed_timestamp = ?, attachments = COALESCE(?, attachments)
        WHERE mid = ?
        "#,
    )
    .bind(timestamp::now())
    .bind(attachments)
    .bind(mid)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Message",
            id: mid.to_string(),
        });
    }

    Ok(())
}
