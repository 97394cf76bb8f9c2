//! Completed report persistence.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::models::ReportRow;
use crate::timestamp::format_timestamp;
use crate::Result;

/// Insert a completed report. Returns the new row ID.
pub async fn insert_report(
    pool: &SqlitePool,
    user_id: &str,
    tags: &[String],
    images: &[String],
    target: Option<&str>,
    timestamp: DateTime<Utc>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO reports (user_id, tags, images, target, timestamp)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(serde_json::to_string(tags)?)
    .bind(serde_json::to_string(images)?)
    .bind(target)
    .bind(format_timestamp(timestamp))
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Up to `limit` reports of a user at or before `cursor`, newest first.
pub async fn load_page(
    pool: &SqlitePool,
    user_id: &str,
    cursor: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<ReportRow>> {
    let rows = sqlx::query_as::<_, ReportRow>(
        r#"
        SELECT id, user_id, tags, images, target, timestamp
        FROM reports
        WHERE user_id = ? AND timestamp <= ?
        ORDER BY timestamp DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(format_timestamp(cursor))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
