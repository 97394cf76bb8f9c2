//! Preference storage for tag and target suggestions.

use sqlx::SqlitePool;

use crate::models::PreferenceRecord;
use crate::timestamp;
use crate::Result;

/// Create or replace a user's preference lists.
pub async fn upsert_preference(
    pool: &SqlitePool,
    user_id: &str,
    tags: &[String],
    targets: &[String],
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO preferences (user_id, tags, targets, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            tags = excluded.tags,
            targets = excluded.targets,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(user_id)
    .bind(serde_json::to_string(tags)?)
    .bind(serde_json::to_string(targets)?)
    .bind(timestamp::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a user's preference lists.
pub async fn get_preference(pool: &SqlitePool, user_id: &str) -> Result<Option<PreferenceRecord>> {
    let record = sqlx::query_as::<_, PreferenceRecord>(
        r#"
        SELECT user_id, tags, targets, updated_at
        FROM preferences
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}
