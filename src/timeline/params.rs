use super::{EntityId, Selection, TimelineCategory};
use crate::position::{PositionKey, StorageScope};

/// Parameters of one fetch cycle.
///
/// Built fresh by the controller for every cycle and frozen once handed to
/// the fetch worker. A result is applied only if its `generation` still
/// matches the session's; otherwise the cycle was superseded.
#[derive(Debug, Clone)]
pub struct ListParameters {
    pub category: TimelineCategory,
    pub combined: bool,
    pub acting_account_id: EntityId,
    /// Never 0 for `TimelineCategory::User`.
    pub selected_entity_id: EntityId,
    pub search_query: String,
    pub selection: Selection,
    pub row_limit: usize,
    /// Read-ahead record the fetch must reach, 0 when unbounded by identity.
    pub resume_from_id: EntityId,
    pub appending: bool,
    /// A position was restored and this fetch extends the window.
    pub incremental_session: bool,
    pub requery: bool,
    pub generation: u64,
    /// Timeline to reload remotely once this cycle is applied.
    pub reload_hint: TimelineCategory,
}

impl ListParameters {
    /// Parameters that were never initialized with a real timeline.
    pub fn is_empty(&self) -> bool {
        self.category.is_unknown()
    }

    pub fn has_search(&self) -> bool {
        !self.search_query.is_empty()
    }

    /// Where positions for this timeline live, given the acting account's name.
    pub fn storage_scope(&self, account_name: Option<&str>) -> StorageScope {
        match account_name {
            Some(name) if self.category != TimelineCategory::User && !self.combined => {
                StorageScope::Account(name.to_string())
            }
            _ => StorageScope::Global,
        }
    }

    pub fn position_key(&self, account_name: Option<&str>) -> PositionKey {
        PositionKey::new(
            self.storage_scope(account_name),
            self.category,
            self.selected_entity_id,
            &self.search_query,
        )
    }

    /// The store query this cycle issues.
    pub fn fetch_request(&self) -> FetchRequest {
        let bound = if self.resume_from_id > 0 && !self.appending {
            FetchBound::ThroughRecord {
                id: self.resume_from_id,
                fallback_limit: self.row_limit,
            }
        } else {
            FetchBound::Limit(self.row_limit)
        };
        FetchRequest {
            category: self.category,
            acting_account_id: self.acting_account_id,
            selection: self.selection.clone(),
            search_query: self.search_query.clone(),
            bound,
            requery: self.requery,
        }
    }
}

/// How far down the newest-first ordering a query reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchBound {
    /// `LIMIT 0,<n>`.
    Limit(usize),
    /// Every record down to and including `id`; `fallback_limit` applies if
    /// the record no longer exists.
    ThroughRecord { id: EntityId, fallback_limit: usize },
}

/// A windowed query against the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub category: TimelineCategory,
    pub acting_account_id: EntityId,
    pub selection: Selection,
    /// Empty when not searching.
    pub search_query: String,
    pub bound: FetchBound,
    pub requery: bool,
}

/// Row limit for the next fetch.
pub fn row_limit(materialized: usize, appending: bool, page_size: usize) -> usize {
    if appending {
        materialized + page_size
    } else {
        materialized.max(page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(category: TimelineCategory, combined: bool) -> ListParameters {
        ListParameters {
            category,
            combined,
            acting_account_id: 7,
            selected_entity_id: if category == TimelineCategory::User { 42 } else { 0 },
            search_query: String::new(),
            selection: Selection::Unrestricted,
            row_limit: 100,
            resume_from_id: 0,
            appending: false,
            incremental_session: false,
            requery: false,
            generation: 1,
            reload_hint: TimelineCategory::Unknown,
        }
    }

    #[test]
    fn test_row_limit() {
        assert_eq!(row_limit(0, false, 100), 100);
        assert_eq!(row_limit(150, false, 100), 150);
        assert_eq!(row_limit(100, true, 100), 200);
        assert_eq!(row_limit(150, true, 100), 250);
    }

    #[test]
    fn test_storage_scope() {
        let home = params(TimelineCategory::Home, false);
        assert_eq!(
            home.storage_scope(Some("alice")),
            StorageScope::Account("alice".to_string())
        );
        assert_eq!(home.storage_scope(None), StorageScope::Global);
        assert_eq!(
            params(TimelineCategory::Home, true).storage_scope(Some("alice")),
            StorageScope::Global
        );
        assert_eq!(
            params(TimelineCategory::User, false).storage_scope(Some("alice")),
            StorageScope::Global
        );
    }

    #[test]
    fn test_fetch_bound() {
        let mut p = params(TimelineCategory::Home, false);
        assert_eq!(p.fetch_request().bound, FetchBound::Limit(100));

        p.resume_from_id = 55;
        assert_eq!(
            p.fetch_request().bound,
            FetchBound::ThroughRecord {
                id: 55,
                fallback_limit: 100
            }
        );

        p.appending = true;
        p.row_limit = 200;
        assert_eq!(p.fetch_request().bound, FetchBound::Limit(200));
    }
}
