//! Scoped key-value preferences.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::store::PrefValue;

pub async fn get_long(pool: &SqlitePool, scope: &str, key: &str) -> Result<Option<i64>> {
    let value: Option<Option<i64>> =
        sqlx::query_scalar("SELECT long_value FROM prefs WHERE scope = ? AND key = ?")
            .bind(scope)
            .bind(key)
            .fetch_optional(pool)
            .await?;
    Ok(value.flatten())
}

pub async fn get_string(pool: &SqlitePool, scope: &str, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT text_value FROM prefs WHERE scope = ? AND key = ?")
            .bind(scope)
            .bind(key)
            .fetch_optional(pool)
            .await?;
    Ok(value.flatten())
}

/// Upsert several keys in one transaction.
pub async fn put(pool: &SqlitePool, scope: &str, entries: &[(&str, PrefValue)]) -> Result<()> {
    let mut tx = pool.begin().await?;

    for (key, value) in entries {
        let (long_value, text_value) = match value {
            PrefValue::Long(v) => (Some(*v), None),
            PrefValue::Text(s) => (None, Some(s.as_str())),
        };
        sqlx::query(
            "INSERT OR REPLACE INTO prefs (scope, key, long_value, text_value) VALUES (?, ?, ?, ?)",
        )
        .bind(scope)
        .bind(*key)
        .bind(long_value)
        .bind(text_value)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

pub async fn remove(pool: &SqlitePool, scope: &str, keys: &[&str]) -> Result<()> {
    let mut tx = pool.begin().await?;

    for key in keys {
        sqlx::query("DELETE FROM prefs WHERE scope = ? AND key = ?")
            .bind(scope)
            .bind(*key)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::Database;
    use super::*;

    #[tokio::test]
    async fn test_long_and_string_values() {
        let db = Database::open_in_memory().await.unwrap();
        let pool = db.pool();

        put(
            pool,
            "alice",
            &[
                ("count", PrefValue::Long(7)),
                ("name", PrefValue::Text("x".to_string())),
            ],
        )
        .await
        .unwrap();

        assert_eq!(get_long(pool, "alice", "count").await.unwrap(), Some(7));
        assert_eq!(
            get_string(pool, "alice", "name").await.unwrap(),
            Some("x".to_string())
        );
        // Wrong type reads as absent
        assert_eq!(get_long(pool, "alice", "name").await.unwrap(), None);
        assert_eq!(get_long(pool, "", "count").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite_and_remove() {
        let db = Database::open_in_memory().await.unwrap();
        let pool = db.pool();

        put(pool, "", &[("k", PrefValue::Long(1))]).await.unwrap();
        put(pool, "", &[("k", PrefValue::Long(2))]).await.unwrap();
        assert_eq!(get_long(pool, "", "k").await.unwrap(), Some(2));

        remove(pool, "", &["k", "missing"]).await.unwrap();
        assert_eq!(get_long(pool, "", "k").await.unwrap(), None);
    }
}
