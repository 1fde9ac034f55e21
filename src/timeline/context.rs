//! The per-room flags that drive the timeline postprocessing stages.

use ruma::{MilliSecondsSinceUnixEpoch, OwnedEventId, OwnedUserId};
use serde::{Deserialize, Serialize};

use crate::config::TimelineConfig;


/// Which kind of timeline is being shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineMode {
    /// The room's main, live timeline.
    #[default]
    Live,
    /// A timeline focused on a specific event, e.g., after jumping to a reply.
    FocusedOnEvent,
    /// Only the room's pinned events.
    PinnedEvents,
    /// Only the room's media events.
    Media,
}

/// Everything the postprocessing pipeline knows about a room and its timeline.
///
/// Any change to these flags causes the pipeline to be re-run,
/// even if the raw timeline didn't change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineContext {
    pub is_direct: bool,
    /// The user who created this room, if known.
    pub room_creator: Option<OwnedUserId>,
    pub is_encrypted: bool,
    pub key_backup_enabled: bool,
    /// When the current user last logged in on this device.
    /// Encrypted events sent before then can't be decrypted without key backup.
    pub last_login_timestamp: Option<MilliSecondsSinceUnixEpoch>,
    pub mode: TimelineMode,
    pub is_timeline_initialized: bool,
    pub has_more_backward: bool,
    pub has_more_forward: bool,
    /// Whether the raw timeline reaches all the way back to the room's creation.
    pub is_at_start_of_timeline: bool,
    /// The event up to which the current user has read this room.
    pub fully_read_event_id: Option<OwnedEventId>,
    /// The fixed offset from UTC, in seconds, used to compute day dividers.
    pub utc_offset_seconds: i32,
    /// Whether to insert day dividers and the read marker.
    pub day_dividers: bool,
}

impl Default for TimelineContext {
    fn default() -> Self {
        Self::from_config(&TimelineConfig::default())
    }
}

impl TimelineContext {
    /// Returns a context for a not-yet-initialized live timeline
    /// that uses the day divider settings from the given config.
    pub fn from_config(config: &TimelineConfig) -> Self {
        Self {
            is_direct: false,
            room_creator: None,
            is_encrypted: false,
            key_backup_enabled: false,
            last_login_timestamp: None,
            mode: TimelineMode::Live,
            is_timeline_initialized: false,
            has_more_backward: false,
            has_more_forward: false,
            is_at_start_of_timeline: false,
            fully_read_event_id: None,
            utc_offset_seconds: config.utc_offset_seconds,
            day_dividers: config.day_dividers,
        }
    }
}
