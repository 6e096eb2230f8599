//! Signals exchanged with the presentation surface.

use super::{EntityId, Record, TimelineCategory};

/// Where the surface should scroll after the window changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollTarget {
    /// The restored first-visible record.
    Record { index: usize, id: EntityId },
    /// Most recent record.
    Top,
    /// Last materialized record.
    Bottom { index: usize },
}

/// Remote synchronization the controller asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncRequest {
    /// Download a timeline. `account` is `None` for all accounts.
    FetchTimeline {
        account: Option<String>,
        category: TimelineCategory,
        user_id: EntityId,
        all_timelines: bool,
    },
    /// Search on the remote service.
    Search {
        account: Option<String>,
        query: String,
    },
}

/// A record the user asked to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenRequest {
    pub record_id: EntityId,
    pub account_id: EntityId,
    pub category: TimelineCategory,
}

/// Receives everything the controller wants shown or done.
///
/// All calls happen on the owner task.
pub trait TimelineSurface: Send {
    /// The materialized window was replaced.
    fn records_changed(&mut self, records: &[Record]);

    fn set_loading(&mut self, loading: bool);

    fn scroll_to(&mut self, target: ScrollTarget);

    fn request_sync(&mut self, request: SyncRequest);

    fn open_record(&mut self, request: OpenRequest);
}
