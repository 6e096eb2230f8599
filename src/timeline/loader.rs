//! Scroll-triggered loading of the next page.

use super::session::SessionState;

/// Scroll position change reported by the presentation surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollEvent {
    pub first_visible_index: usize,
    pub visible_count: usize,
    pub total_count: usize,
}

/// Whether this scroll event should start an appending fetch.
///
/// Fires only when the visible window touches the bottom of the
/// materialized records, and never while a fetch is in flight.
pub fn should_load_more(state: &SessionState, event: &ScrollEvent) -> bool {
    state.position_restored
        && !state.is_fetch_in_flight()
        && !state.no_more_items
        && !state.finishing
        && !state.suspended
        && event.visible_count > 0
        && event.first_visible_index > 0
        && event.first_visible_index + event.visible_count >= event.total_count
}
