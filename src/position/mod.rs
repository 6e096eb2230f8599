//! Scroll position persistence, keyed by timeline identity.

mod key;
mod store;

pub use key::{PositionKey, StorageScope};
pub use store::{PositionLookup, PositionStore};
