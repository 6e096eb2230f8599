//! Engine-wide constants for tuning and persistence
//!
//! Centralizes magic numbers and persisted key shapes.

/// Number of records added to the window per page.
/// The first fetch of a session never asks for fewer than this.
pub const PAGE_SIZE: usize = 100;

/// Prefix of every persisted position key.
/// Keys look like `LAST_POS_<category>[_user<id>][_search]`; changing this
/// orphans positions saved by earlier versions.
pub const KEY_LAST_POSITION: &str = "LAST_POS_";

/// Suffix of the sibling key holding the read-ahead record id.
pub const KEY_SUFFIX_LAST: &str = "_last";

/// Suffix of the sibling key holding the search query at save time.
pub const KEY_SUFFIX_QUERY_STRING: &str = "_querystring";

/// Capacity of the fetch worker command channel.
pub const FETCH_COMMAND_CAPACITY: usize = 8;

/// Capacity of the fetch worker event channel.
pub const FETCH_EVENT_CAPACITY: usize = 8;

/// Moka cache settings for resolved account scopes.
pub const ACCOUNT_SCOPE_CACHE_CAPACITY: u64 = 256;
pub const ACCOUNT_SCOPE_CACHE_TTL_SECS: u64 = 600;

/// Connection pool size for the timeline database.
pub const POOL_SIZE: u32 = 4;

/// Default number of days of history kept by the pruner (0 = unlimited).
pub const DEFAULT_HISTORY_DAYS: u32 = 3;

/// Default maximum number of records kept by the pruner (0 = unlimited).
pub const DEFAULT_HISTORY_SIZE: u32 = 2000;

/// Number of recent search queries remembered for suggestions.
pub const MAX_RECENT_QUERIES: i64 = 50;
