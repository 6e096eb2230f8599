//! Durable scroll positions.
//!
//! Two record ids are stored per position: the first visible record and a
//! read-ahead record. A resuming fetch reads at least down to the read-ahead
//! record so the first visible one is in the window when restoring. The
//! search query at save time is stored too; a position saved under another
//! query is never restored.

use std::sync::Arc;

use anyhow::Result;

use super::PositionKey;
use crate::store::{PrefValue, Preferences};
use crate::timeline::EntityId;

/// Outcome of a position lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionLookup {
    Stored(EntityId),
    /// Nothing was ever saved under this key.
    NeverStored,
    /// A position exists but was saved under a different search query.
    StaleQuery,
}

impl PositionLookup {
    /// The stored id, if it is a valid record identity.
    pub fn id(self) -> Option<EntityId> {
        match self {
            Self::Stored(id) if id > 0 => Some(id),
            _ => None,
        }
    }
}

pub struct PositionStore<P> {
    prefs: Arc<P>,
}

impl<P> Clone for PositionStore<P> {
    fn clone(&self) -> Self {
        Self {
            prefs: Arc::clone(&self.prefs),
        }
    }
}

impl<P: Preferences> PositionStore<P> {
    pub fn new(prefs: Arc<P>) -> Self {
        Self { prefs }
    }

    /// Persist a position. Returns false (and stores nothing) without a visible record.
    pub async fn save(
        &self,
        key: &PositionKey,
        first_visible_id: EntityId,
        read_ahead_id: EntityId,
        query: &str,
    ) -> Result<bool> {
        if first_visible_id <= 0 {
            tracing::debug!("Position save skipped: no visible items for {}", key);
            return Ok(false);
        }

        let first_key = key.first_visible_key();
        let read_ahead_key = key.read_ahead_key();
        let query_key = key.query_string_key();
        self.prefs
            .put(
                &key.scope,
                &[
                    (first_key.as_str(), PrefValue::Long(first_visible_id)),
                    (read_ahead_key.as_str(), PrefValue::Long(read_ahead_id)),
                    (query_key.as_str(), PrefValue::Text(query.to_string())),
                ],
            )
            .await?;

        tracing::debug!(
            "Position saved {}={}, last={}",
            key,
            first_visible_id,
            read_ahead_id
        );
        Ok(true)
    }

    pub async fn load_first(&self, key: &PositionKey, query: &str) -> Result<PositionLookup> {
        self.load(key, &key.first_visible_key(), query).await
    }

    pub async fn load_read_ahead(&self, key: &PositionKey, query: &str) -> Result<PositionLookup> {
        self.load(key, &key.read_ahead_key(), query).await
    }

    async fn load(&self, key: &PositionKey, id_key: &str, query: &str) -> Result<PositionLookup> {
        // An absent query string counts as the empty query
        let stored_query = self
            .prefs
            .get_string(&key.scope, &key.query_string_key())
            .await?
            .unwrap_or_default();
        if stored_query != query {
            return Ok(PositionLookup::StaleQuery);
        }

        Ok(match self.prefs.get_long(&key.scope, id_key).await? {
            Some(id) => PositionLookup::Stored(id),
            None => PositionLookup::NeverStored,
        })
    }

    /// Forget both ids and the query string of this key.
    pub async fn clear(&self, key: &PositionKey) -> Result<()> {
        let first_key = key.first_visible_key();
        let read_ahead_key = key.read_ahead_key();
        let query_key = key.query_string_key();
        self.prefs
            .remove(
                &key.scope,
                &[
                    first_key.as_str(),
                    read_ahead_key.as_str(),
                    query_key.as_str(),
                ],
            )
            .await?;
        tracing::debug!("Position forgot {}", key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::StorageScope;
    use crate::store::Database;
    use crate::timeline::TimelineCategory;

    async fn store() -> PositionStore<Database> {
        PositionStore::new(Arc::new(Database::open_in_memory().await.unwrap()))
    }

    fn home_key(query: &str) -> PositionKey {
        PositionKey::new(
            StorageScope::Account("alice".to_string()),
            TimelineCategory::Home,
            0,
            query,
        )
    }

    #[tokio::test]
    async fn test_round_trip_under_same_query() {
        let positions = store().await;
        let key = home_key("");

        assert!(positions.save(&key, 40, 140, "").await.unwrap());
        assert_eq!(
            positions.load_first(&key, "").await.unwrap(),
            PositionLookup::Stored(40)
        );
        assert_eq!(
            positions.load_read_ahead(&key, "").await.unwrap(),
            PositionLookup::Stored(140)
        );
    }

    #[tokio::test]
    async fn test_other_query_is_stale_and_not_destructive() {
        let positions = store().await;
        let key = home_key("foo");

        positions.save(&key, 40, 140, "foo").await.unwrap();
        assert_eq!(
            positions.load_first(&key, "bar").await.unwrap(),
            PositionLookup::StaleQuery
        );
        assert_eq!(positions.load_first(&key, "bar").await.unwrap().id(), None);
        // The stored pair survives the mismatched read
        assert_eq!(
            positions.load_first(&key, "foo").await.unwrap(),
            PositionLookup::Stored(40)
        );
    }

    #[tokio::test]
    async fn test_never_stored() {
        let positions = store().await;
        assert_eq!(
            positions.load_first(&home_key(""), "").await.unwrap(),
            PositionLookup::NeverStored
        );
    }

    #[tokio::test]
    async fn test_save_without_visible_item_is_skipped() {
        let positions = store().await;
        let key = home_key("");

        assert!(!positions.save(&key, 0, 0, "").await.unwrap());
        assert_eq!(
            positions.load_first(&key, "").await.unwrap(),
            PositionLookup::NeverStored
        );
    }

    #[tokio::test]
    async fn test_clear() {
        let positions = store().await;
        let key = home_key("");

        positions.save(&key, 40, 140, "").await.unwrap();
        positions.clear(&key).await.unwrap();
        assert_eq!(
            positions.load_first(&key, "").await.unwrap(),
            PositionLookup::NeverStored
        );
        assert_eq!(
            positions.load_read_ahead(&key, "").await.unwrap(),
            PositionLookup::NeverStored
        );
    }

    #[tokio::test]
    async fn test_scopes_are_isolated() {
        let positions = store().await;
        let alice = home_key("");
        let global = PositionKey::new(StorageScope::Global, TimelineCategory::Home, 0, "");

        positions.save(&alice, 40, 140, "").await.unwrap();
        assert_eq!(
            positions.load_first(&global, "").await.unwrap(),
            PositionLookup::NeverStored
        );
    }
}
