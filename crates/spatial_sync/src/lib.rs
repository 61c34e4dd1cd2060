//! Keeps the map's per-layer record sets consistent with the current viewport
//! and filters.
//!
//! `RequestCoordinator` is the synchronous core: it decides when a fetch is
//! needed, tags every fetch with a generation and applies only results of the
//! current one. `SpatialSync` runs it on a tokio task against any
//! `SpatialSource`.

pub mod coordinator;
pub mod driver;
pub mod error;
pub mod filter;
pub mod layer;
pub mod render;
pub mod request;
pub mod source;
pub mod store;
pub mod viewport;

pub use coordinator::{Outcome, RequestCoordinator, Ticket};
pub use driver::{Command, SpatialSync, SyncConfig, SyncSnapshot};
pub use error::SyncError;
pub use filter::{FilterKey, FilterState};
pub use layer::{LayerKind, LayerSet, UnknownLayer};
pub use render::{Marker, MarkerStyle, Selection, render};
pub use request::{Generation, RequestDescriptor, TicketId};
pub use source::{BoxFuture, SourceError, SpatialSource};
pub use store::{LayerSlot, LayerStore, LoadState, StoredRecord};
pub use viewport::ViewportState;
