//! Recently used search queries.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::constants::MAX_RECENT_QUERIES;

pub async fn save_recent_query(pool: &SqlitePool, query: &str) -> Result<()> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(());
    }
    let now = chrono::Utc::now().timestamp_millis();

    sqlx::query(
        r#"
        INSERT INTO recent_queries (query, used_at) VALUES (?, ?)
        ON CONFLICT(query) DO UPDATE SET used_at = excluded.used_at
        "#,
    )
    .bind(query)
    .bind(now)
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        DELETE FROM recent_queries WHERE query NOT IN (
            SELECT query FROM recent_queries ORDER BY used_at DESC LIMIT ?
        )
        "#,
    )
    .bind(MAX_RECENT_QUERIES)
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recent first.
pub async fn recent_queries(pool: &SqlitePool, limit: usize) -> Result<Vec<String>> {
    let queries = sqlx::query_scalar("SELECT query FROM recent_queries ORDER BY used_at DESC LIMIT ?")
        .bind(limit as i64)
        .fetch_all(pool)
        .await?;
    Ok(queries)
}
