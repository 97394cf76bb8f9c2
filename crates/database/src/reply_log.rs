//! Outbound reply log.

use sqlx::SqlitePool;

use crate::models::ReplyLogEntry;
use crate::timestamp;
use crate::Result;

/// Log a reply sent to a user.
pub async fn put_reply(pool: &SqlitePool, user_id: &str, body: &serde_json::Value) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO replies (user_id, body, timestamp)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(serde_json::to_string(body)?)
    .bind(timestamp::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recent replies sent to a user, newest first.
pub async fn list_replies(
    pool: &SqlitePool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<ReplyLogEntry>> {
    let rows = sqlx::query_as::<_, ReplyLogEntry>(
        r#"
        SELECT id, user_id, body, timestamp
        FROM replies
        WHERE user_id = ?
        ORDER BY timestamp DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
