//! A room's timeline: its items, the context flags that describe it,
//! and the pipeline that turns the raw timeline into what is displayed.

pub mod context;
pub mod item;
pub mod postprocess;
pub mod processor;

pub use context::{TimelineContext, TimelineMode};
pub use postprocess::TimelinePipeline;
pub use processor::{TimelineInput, TimelineProcessor, TimelineStatus};
