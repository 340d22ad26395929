//! In-process realtime sync: a per-table change feed, live collections built
//! on top of it, and the table registry used by the SSE endpoint.

pub mod feed;
pub mod live;
pub mod tables;

pub use feed::{ChangeFeed, ChangeKind, ChangeStream, EqFilter, RowChange, StreamError};
pub use live::{LiveCollection, RowKey, SnapshotLoader};
pub use tables::{EntityLoader, SyncTable};
