//! Per-user conversation persistence.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::ConversationRecord;
use crate::timestamp;

/// Get a user's conversation, creating an empty one on first contact.
pub async fn get_or_create(pool: &SqlitePool, user_id: &str) -> Result<ConversationRecord> {
    let now = timestamp::now();
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO conversations (user_id, context, draft, created_on, last_modified)
        VALUES (?, '{}', '{}', ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    get_conversation(pool, user_id).await
}

/// Get a user's conversation.
pub async fn get_conversation(pool: &SqlitePool, user_id: &str) -> Result<ConversationRecord> {
    sqlx::query_as::<_, ConversationRecord>(
        r#"
        SELECT user_id, context, draft, created_on, last_modified
        FROM conversations
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Conversation",
        id: user_id.to_string(),
    })
}

/// Store the context and draft after a turn.
pub async fn save_conversation(
    pool: &SqlitePool,
    user_id: &str,
    context: &serde_json::Value,
    draft: &serde_json::Value,
) -> Result<()> {
    let now = timestamp::now();
    sqlx::query(
        r#"
        INSERT INTO conversations (user_id, context, draft, created_on, last_modified)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            context = excluded.context,
            draft = excluded.draft,
            last_modified = excluded.last_modified
        "#,
    )
    .bind(user_id)
    .bind(serde_json::to_string(context)?)
    .bind(serde_json::to_string(draft)?)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Reset a user's conversation to empty. The row itself is kept.
pub async fn clear_conversation(pool: &SqlitePool, user_id: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE conversations
        SET context = '{}', draft = '{}', last_modified = ?
        WHERE user_id = ?
        "#,
    )
    .bind(timestamp::now())
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}
