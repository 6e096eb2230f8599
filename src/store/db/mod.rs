//! SQLite storage for records, preferences, and accounts.
//!
//! This module is split into:
//! - `mod.rs` - Database struct, connection pool, trait implementations
//! - `schema.rs` - Database schema initialization
//! - `records.rs` - Record insertion and windowed queries
//! - `prefs.rs` - Scoped key-value preferences
//! - `accounts.rs` - Accounts, users, sync bookkeeping
//! - `prune.rs` - Removal of old records
//! - `suggestions.rs` - Recent search queries

mod accounts;
mod prefs;
mod prune;
mod records;
mod schema;
mod suggestions;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use super::{AccountResolver, FetchOutcome, Preferences, PrefValue, RecordStore};
use crate::constants::{ACCOUNT_SCOPE_CACHE_CAPACITY, ACCOUNT_SCOPE_CACHE_TTL_SECS, POOL_SIZE};
use crate::error::StoreResult;
use crate::position::StorageScope;
use crate::timeline::{EntityId, FetchRequest, Record, RecordFlags, Selection, TimelineCategory};

pub use prune::PruneStats;

/// Resolved account scopes keyed by (entity, combined).
type ScopeCache = moka::future::Cache<(EntityId, bool), Arc<Vec<EntityId>>>;

pub struct Database {
    pool: SqlitePool,
    scope_cache: ScopeCache,
}

impl Database {
    /// Get a reference to the connection pool (for tests).
    #[cfg(test)]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl Database {
    fn create_scope_cache() -> ScopeCache {
        moka::future::Cache::builder()
            .max_capacity(ACCOUNT_SCOPE_CACHE_CAPACITY)
            .time_to_live(Duration::from_secs(ACCOUNT_SCOPE_CACHE_TTL_SECS))
            .build()
    }

    pub async fn open(path: &Path) -> Result<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", path.display());

        let options = SqliteConnectOptions::from_str(&db_url)?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(POOL_SIZE)
            .connect_with(options)
            .await
            .context("Failed to create connection pool")?;

        schema::init_schema(&pool).await?;

        Ok(Self {
            pool,
            scope_cache: Self::create_scope_cache(),
        })
    }

    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // A single connection that never expires keeps the in-memory database alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to create in-memory connection pool")?;

        schema::init_schema(&pool).await?;

        Ok(Self {
            pool,
            scope_cache: Self::create_scope_cache(),
        })
    }

    //
    // Account Operations (delegated to accounts module)
    //

    pub async fn add_account(&self, id: EntityId, name: &str, origin_id: i64) -> Result<()> {
        accounts::add_account(&self.pool, id, name, origin_id).await?;
        self.scope_cache.invalidate_all();
        Ok(())
    }

    pub async fn add_user(&self, id: EntityId, name: &str, origin_id: i64) -> Result<()> {
        accounts::add_user(&self.pool, id, name, origin_id).await
    }

    pub async fn mark_synced(&self, account_id: EntityId, category: TimelineCategory) -> Result<()> {
        accounts::mark_synced(&self.pool, account_id, category).await
    }

    //
    // Record Operations (delegated to records module)
    //

    pub async fn insert_records(&self, records: &[Record]) -> Result<()> {
        records::insert_records(&self.pool, records).await
    }

    pub async fn add_flags(
        &self,
        record_id: EntityId,
        account_id: EntityId,
        flags: RecordFlags,
    ) -> Result<()> {
        records::add_flags(&self.pool, record_id, account_id, flags).await
    }

    #[cfg(test)]
    pub async fn get_record(&self, id: EntityId, account_id: EntityId) -> Result<Option<Record>> {
        records::get_record(&self.pool, id, account_id).await
    }

    //
    // Maintenance
    //

    /// Delete old records. See [`prune::prune`].
    pub async fn prune(&self, max_days: u32, max_size: u32) -> Result<PruneStats> {
        prune::prune(&self.pool, max_days, max_size, chrono::Utc::now().timestamp()).await
    }

    pub async fn recent_queries(&self, limit: usize) -> Result<Vec<String>> {
        suggestions::recent_queries(&self.pool, limit).await
    }
}

impl RecordStore for Database {
    async fn query(&self, request: &FetchRequest) -> StoreResult<FetchOutcome> {
        let records = records::query_records(&self.pool, request).await?;

        // Only a fresh load asks the remote side for missing timelines
        let reload_hint = if request.requery {
            TimelineCategory::Unknown
        } else {
            match accounts::reload_hint(&self.pool, request.acting_account_id, request.category)
                .await
            {
                Ok(hint) => hint,
                Err(e) => {
                    tracing::warn!("Failed to compute reload hint: {}", e);
                    TimelineCategory::Unknown
                }
            }
        };

        Ok(FetchOutcome {
            records,
            reload_hint,
        })
    }

    async fn count(&self, selection: &Selection, search_query: &str) -> StoreResult<usize> {
        records::count_records(&self.pool, selection, search_query).await
    }
}

impl Preferences for Database {
    async fn get_long(&self, scope: &StorageScope, key: &str) -> Result<Option<i64>> {
        prefs::get_long(&self.pool, scope.as_str(), key).await
    }

    async fn get_string(&self, scope: &StorageScope, key: &str) -> Result<Option<String>> {
        prefs::get_string(&self.pool, scope.as_str(), key).await
    }

    async fn put(&self, scope: &StorageScope, entries: &[(&str, PrefValue)]) -> Result<()> {
        prefs::put(&self.pool, scope.as_str(), entries).await
    }

    async fn remove(&self, scope: &StorageScope, keys: &[&str]) -> Result<()> {
        prefs::remove(&self.pool, scope.as_str(), keys).await
    }

    async fn save_recent_query(&self, query: &str) -> Result<()> {
        suggestions::save_recent_query(&self.pool, query).await
    }
}

impl AccountResolver for Database {
    async fn resolve_account_scope(&self, entity_id: EntityId, combined: bool) -> Result<Vec<EntityId>> {
        if !combined {
            return Ok(vec![entity_id]);
        }

        let key = (entity_id, combined);
        if let Some(ids) = self.scope_cache.get(&key).await {
            return Ok(ids.as_ref().clone());
        }

        let ids = accounts::all_account_ids(&self.pool).await?;
        self.scope_cache.insert(key, Arc::new(ids.clone())).await;
        Ok(ids)
    }

    async fn account_name(&self, account_id: EntityId) -> Result<Option<String>> {
        accounts::account_name(&self.pool, account_id).await
    }

    async fn is_own_account(&self, id: EntityId) -> Result<bool> {
        Ok(id != 0 && accounts::account_name(&self.pool, id).await?.is_some())
    }

    async fn account_for_user(
        &self,
        user_id: EntityId,
        acting_account_id: EntityId,
    ) -> Result<Option<EntityId>> {
        accounts::account_for_user(&self.pool, user_id, acting_account_id).await
    }
}
