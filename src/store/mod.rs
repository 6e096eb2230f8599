//! Collaborators the timeline engine consumes.
//!
//! - `RecordStore` - windowed, ordered queries over records
//! - `Preferences` - durable key-value storage (positions, recent queries)
//! - `AccountResolver` - account identities and their scopes
//!
//! `db` implements all three on SQLite.

pub mod db;

use std::future::Future;

use anyhow::Result;

use crate::error::StoreResult;
use crate::position::StorageScope;
use crate::timeline::{EntityId, FetchRequest, Record, Selection, TimelineCategory};

pub use db::Database;

/// Result of a windowed query.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// Records ordered newest first.
    pub records: Vec<Record>,
    /// Timeline the remote service should reload, or `Unknown`.
    pub reload_hint: TimelineCategory,
}

/// Abstract, orderable collection of records with stable integer identities.
pub trait RecordStore: Send + Sync + 'static {
    /// Run a windowed query. May block for a long time; called off the owner task.
    fn query(&self, request: &FetchRequest) -> impl Future<Output = StoreResult<FetchOutcome>> + Send;

    /// Count the records matching a selection.
    fn count(
        &self,
        selection: &Selection,
        search_query: &str,
    ) -> impl Future<Output = StoreResult<usize>> + Send;
}

/// Value written to the preference store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefValue {
    Long(i64),
    Text(String),
}

/// Durable key-value persistence, partitioned by storage scope.
pub trait Preferences: Send + Sync + 'static {
    fn get_long(
        &self,
        scope: &StorageScope,
        key: &str,
    ) -> impl Future<Output = Result<Option<i64>>> + Send;

    fn get_string(
        &self,
        scope: &StorageScope,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Upsert several keys at once; either all are written or none.
    fn put(
        &self,
        scope: &StorageScope,
        entries: &[(&str, PrefValue)],
    ) -> impl Future<Output = Result<()>> + Send;

    fn remove(&self, scope: &StorageScope, keys: &[&str]) -> impl Future<Output = Result<()>> + Send;

    /// Remember a search query for suggestions.
    fn save_recent_query(&self, query: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Resolves account identities.
pub trait AccountResolver: Send + Sync + 'static {
    /// The account ids a selection for `entity_id` covers: just `entity_id`,
    /// or every linked account id when `combined`.
    fn resolve_account_scope(
        &self,
        entity_id: EntityId,
        combined: bool,
    ) -> impl Future<Output = Result<Vec<EntityId>>> + Send;

    /// Name of one of our accounts, used as its storage scope.
    fn account_name(&self, account_id: EntityId) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Whether `id` is one of our own accounts.
    fn is_own_account(&self, id: EntityId) -> impl Future<Output = Result<bool>> + Send;

    /// The account to sync a user's timeline with: the user's own account,
    /// else the acting account if it shares the user's origin, else the
    /// first account of that origin.
    fn account_for_user(
        &self,
        user_id: EntityId,
        acting_account_id: EntityId,
    ) -> impl Future<Output = Result<Option<EntityId>>> + Send;
}

/// Everything the controller needs from its environment.
pub trait TimelineBackend: RecordStore + Preferences + AccountResolver {}

impl<T: RecordStore + Preferences + AccountResolver> TimelineBackend for T {}
