//! Configuration for the room list and timeline processing.
//!
//! Every field has a default, so an empty JSON object `{}` is a valid config.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::room::room_display_filter::RoomListFilter;

/// The number of rooms requested per page by default.
pub const DEFAULT_PAGE_SIZE: usize = 20;


#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub room_list: RoomListConfig,
    pub timeline: TimelineConfig,
}

impl SyncConfig {
    /// Loads a config from the JSON file at the given path.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomListConfig {
    /// The number of rooms in each page requested from the upstream source.
    pub page_size: usize,
    /// The filter that a new [`DynamicRoomList`](crate::room_list::DynamicRoomList) starts with.
    pub initial_filter: RoomListFilter,
}

impl Default for RoomListConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            initial_filter: RoomListFilter::all(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// The fixed offset from UTC, in seconds, used to decide which day an event falls on.
    pub utc_offset_seconds: i32,
    /// Whether to insert day dividers and the read marker into the timeline.
    pub day_dividers: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            utc_offset_seconds: 0,
            day_dividers: true,
        }
    }
}
