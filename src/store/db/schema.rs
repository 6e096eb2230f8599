//! Database schema initialization.

use anyhow::Result;
use sqlx::SqlitePool;

/// Initialize all tables and indexes.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        -- Messages known locally, newest first by insertion time
        CREATE TABLE IF NOT EXISTS records (
            id INTEGER PRIMARY KEY,
            author_id INTEGER NOT NULL DEFAULT 0,
            sender_id INTEGER NOT NULL DEFAULT 0,
            body TEXT NOT NULL DEFAULT '',
            inserted_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_records_inserted ON records(inserted_at DESC, id DESC);
        CREATE INDEX IF NOT EXISTS idx_records_author ON records(author_id);
        CREATE INDEX IF NOT EXISTS idx_records_sender ON records(sender_id);

        -- Relation of a record to one of our accounts
        CREATE TABLE IF NOT EXISTS record_flags (
            record_id INTEGER NOT NULL REFERENCES records(id) ON DELETE CASCADE,
            account_id INTEGER NOT NULL,
            flags INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (record_id, account_id)
        );

        CREATE INDEX IF NOT EXISTS idx_record_flags_account ON record_flags(account_id, flags);
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        -- Our accounts; id is the account's user id
        CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY,
            name TEXT UNIQUE NOT NULL,
            origin_id INTEGER NOT NULL DEFAULT 0
        );

        -- Other users seen in timelines
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL DEFAULT '',
            origin_id INTEGER NOT NULL DEFAULT 0
        );

        -- Which timelines have been downloaded for an account
        CREATE TABLE IF NOT EXISTS timeline_sync (
            account_id INTEGER NOT NULL,
            category TEXT NOT NULL,
            synced_at INTEGER NOT NULL,
            PRIMARY KEY (account_id, category)
        );

        -- Key-value preferences, scope '' is global
        CREATE TABLE IF NOT EXISTS prefs (
            scope TEXT NOT NULL,
            key TEXT NOT NULL,
            long_value INTEGER,
            text_value TEXT,
            PRIMARY KEY (scope, key)
        );

        -- Recent search queries for suggestions
        CREATE TABLE IF NOT EXISTS recent_queries (
            query TEXT PRIMARY KEY,
            used_at INTEGER NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
