//! Timeline pagination and reading-position persistence over a local record store.

pub mod config;
pub mod constants;
pub mod error;
pub mod position;
pub mod store;
pub mod timeline;

pub use error::{StoreError, StoreResult};
