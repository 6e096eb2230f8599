//! Accounts, users, and timeline download bookkeeping.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::timeline::{EntityId, TimelineCategory};

pub async fn add_account(pool: &SqlitePool, id: EntityId, name: &str, origin_id: i64) -> Result<()> {
    sqlx::query("INSERT OR REPLACE INTO accounts (id, name, origin_id) VALUES (?, ?, ?)")
        .bind(id)
        .bind(name)
        .bind(origin_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn add_user(pool: &SqlitePool, id: EntityId, name: &str, origin_id: i64) -> Result<()> {
    sqlx::query("INSERT OR REPLACE INTO users (id, name, origin_id) VALUES (?, ?, ?)")
        .bind(id)
        .bind(name)
        .bind(origin_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn all_account_ids(pool: &SqlitePool) -> Result<Vec<EntityId>> {
    let ids = sqlx::query_scalar("SELECT id FROM accounts ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(ids)
}

pub async fn account_name(pool: &SqlitePool, id: EntityId) -> Result<Option<String>> {
    let name = sqlx::query_scalar("SELECT name FROM accounts WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(name)
}

async fn account_origin(pool: &SqlitePool, id: EntityId) -> Result<Option<i64>> {
    let origin = sqlx::query_scalar("SELECT origin_id FROM accounts WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(origin)
}

async fn user_origin(pool: &SqlitePool, id: EntityId) -> Result<Option<i64>> {
    if let Some(origin) = account_origin(pool, id).await? {
        return Ok(Some(origin));
    }
    let origin = sqlx::query_scalar("SELECT origin_id FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(origin)
}

/// The account to use for a user's timeline.
pub async fn account_for_user(
    pool: &SqlitePool,
    user_id: EntityId,
    acting_account_id: EntityId,
) -> Result<Option<EntityId>> {
    let origin = match user_origin(pool, user_id).await? {
        Some(origin) if origin != 0 => origin,
        _ => {
            tracing::warn!("Unknown origin for user {}", user_id);
            return Ok(None);
        }
    };

    if account_origin(pool, acting_account_id).await? == Some(origin) {
        return Ok(Some(acting_account_id));
    }
    if account_origin(pool, user_id).await?.is_some() {
        return Ok(Some(user_id));
    }

    let first = sqlx::query_scalar("SELECT id FROM accounts WHERE origin_id = ? ORDER BY id LIMIT 1")
        .bind(origin)
        .fetch_optional(pool)
        .await?;
    Ok(first)
}

/// Record that a timeline was downloaded for an account.
pub async fn mark_synced(
    pool: &SqlitePool,
    account_id: EntityId,
    category: TimelineCategory,
) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        "INSERT OR REPLACE INTO timeline_sync (account_id, category, synced_at) VALUES (?, ?, ?)",
    )
    .bind(account_id)
    .bind(category.sync_category().code())
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

/// Timeline the remote service should be asked for, if the account never downloaded it.
pub async fn reload_hint(
    pool: &SqlitePool,
    account_id: EntityId,
    category: TimelineCategory,
) -> Result<TimelineCategory> {
    if account_id == 0 || matches!(category, TimelineCategory::Unknown | TimelineCategory::All) {
        return Ok(TimelineCategory::Unknown);
    }

    let synced: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM timeline_sync WHERE account_id = ?")
        .bind(account_id)
        .fetch_one(pool)
        .await?;
    if synced == 0 {
        return Ok(TimelineCategory::All);
    }

    let sync_category = category.sync_category();
    let synced: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM timeline_sync WHERE account_id = ? AND category = ?",
    )
    .bind(account_id)
    .bind(sync_category.code())
    .fetch_one(pool)
    .await?;

    Ok(if synced == 0 {
        sync_category
    } else {
        TimelineCategory::Unknown
    })
}
