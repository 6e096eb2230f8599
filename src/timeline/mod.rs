//! Timeline engine: what to show, how much of it, and where the reader was.
//!
//! - `category` / `record` - the data model
//! - `selection` - timeline identity to record predicate
//! - `params` - per-cycle fetch parameters
//! - `controller` - pagination state machine over a fetch actor
//! - `loader` - scroll-triggered appending
//! - `surface` - signals to the presentation layer

mod category;
mod controller;
mod loader;
mod params;
mod record;
mod selection;
mod session;
mod surface;
mod worker;

pub use category::TimelineCategory;
pub use controller::{TimelineController, TimelineRequest};
pub use loader::{ScrollEvent, should_load_more};
pub use params::{FetchBound, FetchRequest, ListParameters, row_limit};
pub use record::{EntityId, Record, RecordFlags};
pub use selection::{Selection, SelectionBuilder, SelectionKey};
pub use session::{Phase, SessionState, Trigger, Viewport};
pub use surface::{OpenRequest, ScrollTarget, SyncRequest, TimelineSurface};
pub use worker::{FetchActorHandle, FetchCommand, FetchEvent, spawn_fetch_actor};
