//! Materialized Matrix room lists and postprocessed room timelines,
//! kept in sync with the incremental diff streams of a sync engine.

/// The closed set of diff operations, and how to apply them.
pub mod update_op;
/// A diff-driven list with a single writer and replay-latest snapshots.
pub mod materialized_list;
pub mod error;
pub mod config;
mod subscription;
pub use subscription::Subscription;

/// Room summaries and the filters that select them.
pub mod room;
/// The room list synchronizer and its filtering/paging controller.
pub mod room_list;
/// Timeline items and the postprocessing pipeline.
pub mod timeline;
/// Generating text previews of timeline events/messages.
pub mod event_preview;

pub mod replay;
pub mod utils;

#[cfg(test)]
mod test_utils;
