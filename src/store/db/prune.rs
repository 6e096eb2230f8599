//! Removal of outdated records so the database does not grow without bound.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::timeline::RecordFlags;

/// Records favorited by any account are kept.
const NOT_FAVORITED: &str = r#"NOT EXISTS (
    SELECT 1 FROM record_flags f WHERE f.record_id = records.id AND (f.flags & ?) != 0
)"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneStats {
    pub deleted_by_age: u64,
    pub deleted_by_size: u64,
    pub total_before: u64,
}

impl PruneStats {
    pub fn deleted(&self) -> u64 {
        self.deleted_by_age + self.deleted_by_size
    }
}

/// Delete records older than `max_days`, then the oldest ones beyond `max_size`.
/// A limit of 0 disables that pass. `now` is a unix timestamp.
pub async fn prune(pool: &SqlitePool, max_days: u32, max_size: u32, now: i64) -> Result<PruneStats> {
    let favorited = RecordFlags::FAVORITED.bits() as i64;
    let mut stats = PruneStats::default();

    if max_days > 0 {
        let cutoff = now - chrono::Duration::days(i64::from(max_days)).num_seconds();
        let result = sqlx::query(&format!(
            "DELETE FROM records WHERE inserted_at < ? AND {NOT_FAVORITED}"
        ))
        .bind(cutoff)
        .bind(favorited)
        .execute(pool)
        .await?;
        stats.deleted_by_age = result.rows_affected();
    }

    if max_size > 0 {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(pool)
            .await?;
        stats.total_before = total as u64;

        let excess = total - i64::from(max_size);
        if excess > 0 {
            // Insertion time of the most recent record to delete
            let newest_to_delete: Option<i64> = sqlx::query_scalar(
                "SELECT inserted_at FROM records ORDER BY inserted_at ASC, id ASC LIMIT 1 OFFSET ?",
            )
            .bind(excess - 1)
            .fetch_optional(pool)
            .await?;

            if let Some(threshold) = newest_to_delete {
                let result = sqlx::query(&format!(
                    "DELETE FROM records WHERE inserted_at <= ? AND {NOT_FAVORITED}"
                ))
                .bind(threshold)
                .bind(favorited)
                .execute(pool)
                .await?;
                stats.deleted_by_size = result.rows_affected();
            }
        }
    }

    tracing::info!(
        "Pruned records: history={} days deleted {}, history size={} deleted {} of {}",
        max_days,
        stats.deleted_by_age,
        max_size,
        stats.deleted_by_size,
        stats.total_before
    );
    Ok(stats)
}
