//! Room summaries: the immutable, display-ready snapshot of a room that the
//! room list synchronizer materializes, and the raw room entry it is built from.

use ruma::{MilliSecondsSinceUnixEpoch, OwnedMxcUri, OwnedRoomAliasId, OwnedRoomId, OwnedUserId, RoomId};
use serde::{Deserialize, Serialize};

use crate::{
    event_preview::text_preview_of_timeline_item,
    timeline::item::TimelineItemContent,
    utils,
};

/// The tag name that marks a room as a favorite.
pub const FAVOURITE_TAG: &str = "m.favourite";
/// The tag name that marks a room as low priority.
pub const LOW_PRIORITY_TAG: &str = "m.lowpriority";


/// The current user's membership state in a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomMembership {
    Joined,
    Invited,
    Knocked,
    Banned,
    Left,
}

/// The user's notification setting for a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomNotificationMode {
    AllMessages,
    MentionsAndKeywordsOnly,
    Mute,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCounts {
    #[serde(default)]
    pub messages: u64,
    #[serde(default)]
    pub mentions: u64,
    #[serde(default)]
    pub notifications: u64,
}

/// A room member as reported by the sync engine, e.g., a room hero or an inviter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMember {
    pub user_id: OwnedUserId,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<OwnedMxcUri>,
}

impl RawMember {
    /// Returns the member's display name if known, otherwise their user ID.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(self.user_id.as_str())
    }
}

/// The latest event in a room, as reported by the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLatestEvent {
    pub sender: OwnedUserId,
    #[serde(default)]
    pub sender_display_name: Option<String>,
    pub timestamp: MilliSecondsSinceUnixEpoch,
    pub content: TimelineItemContent,
}

/// A room exactly as the upstream sync engine delivers it, before any derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRoomEntry {
    pub room_id: OwnedRoomId,
    /// The explicit `m.room.name`, if the room has one.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub canonical_alias: Option<OwnedRoomAliasId>,
    #[serde(default)]
    pub alt_aliases: Vec<OwnedRoomAliasId>,
    #[serde(default)]
    pub avatar_url: Option<OwnedMxcUri>,
    /// The members used to compute a name for rooms that don't have one.
    #[serde(default)]
    pub heroes: Vec<RawMember>,
    /// The users this room is a direct chat with. Empty if it isn't a direct room.
    #[serde(default)]
    pub direct_targets: Vec<OwnedUserId>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub unread: UnreadCounts,
    #[serde(default)]
    pub marked_unread: bool,
    /// The users currently participating in a call in this room.
    #[serde(default)]
    pub active_call_participants: Vec<OwnedUserId>,
    pub membership: RoomMembership,
    #[serde(default)]
    pub latest_event: Option<RawLatestEvent>,
    #[serde(default)]
    pub notification_mode: Option<RoomNotificationMode>,
    /// The user who invited us, if our membership is `Invited`.
    #[serde(default)]
    pub inviter: Option<RawMember>,
}


/// The avatar shown for a room: either an image URI or
/// a string holding the first grapheme of the room's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomSummaryAvatar {
    Text(String),
    Image(OwnedMxcUri),
}
impl Default for RoomSummaryAvatar {
    fn default() -> Self {
        RoomSummaryAvatar::Text(String::new())
    }
}

/// A preview of the latest event in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestEventPreview {
    pub timestamp: MilliSecondsSinceUnixEpoch,
    /// The plaintext preview of the latest event, including the sender's name where relevant.
    pub text: String,
}

/// An immutable, display-ready summary of a room, as shown in the room list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub room_id: OwnedRoomId,
    /// The computed display name of this room; never empty.
    pub display_name: String,
    pub avatar: RoomSummaryAvatar,
    pub canonical_alias: Option<OwnedRoomAliasId>,
    pub alt_aliases: Vec<OwnedRoomAliasId>,
    pub num_unread_messages: u64,
    pub num_unread_mentions: u64,
    pub num_unread_notifications: u64,
    pub is_direct: bool,
    pub is_favorite: bool,
    pub is_low_priority: bool,
    pub is_marked_unread: bool,
    pub has_room_call: bool,
    pub membership: RoomMembership,
    pub latest_event: Option<LatestEventPreview>,
    pub notification_mode: Option<RoomNotificationMode>,
    pub inviter: Option<RawMember>,
}

impl RoomSummary {
    /// Builds a summary from a raw room entry.
    ///
    /// This is a pure mapping: it reads nothing beyond the given `raw` entry.
    pub fn from_raw(raw: &RawRoomEntry) -> Self {
        let display_name = compute_display_name(raw);
        let is_direct = !raw.direct_targets.is_empty();
        let avatar = match (&raw.avatar_url, is_direct, raw.heroes.as_slice()) {
            (Some(url), _, _) => RoomSummaryAvatar::Image(url.clone()),
            // A direct room without its own avatar shows the other user's avatar.
            (None, true, [RawMember { avatar_url: Some(url), .. }]) => RoomSummaryAvatar::Image(url.clone()),
            _ => RoomSummaryAvatar::Text(utils::avatar_from_room_name(&display_name)),
        };
        let latest_event = raw.latest_event.as_ref().map(|latest| {
            let sender = latest.sender_display_name.as_deref().unwrap_or(latest.sender.as_str());
            LatestEventPreview {
                timestamp: latest.timestamp,
                text: text_preview_of_timeline_item(&latest.content, sender).format_with(sender, is_direct),
            }
        });

        Self {
            room_id: raw.room_id.clone(),
            display_name,
            avatar,
            canonical_alias: raw.canonical_alias.clone(),
            alt_aliases: raw.alt_aliases.clone(),
            num_unread_messages: raw.unread.messages,
            num_unread_mentions: raw.unread.mentions,
            num_unread_notifications: raw.unread.notifications,
            is_direct,
            is_favorite: raw.tags.iter().any(|t| t == FAVOURITE_TAG),
            is_low_priority: raw.tags.iter().any(|t| t == LOW_PRIORITY_TAG),
            is_marked_unread: raw.marked_unread,
            has_room_call: !raw.active_call_participants.is_empty(),
            membership: raw.membership,
            latest_event,
            notification_mode: raw.notification_mode,
            inviter: raw.inviter.clone(),
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Whether this room has anything unread: messages, mentions,
    /// notifications, or an explicit "marked as unread" flag.
    pub fn is_unread(&self) -> bool {
        self.is_marked_unread
            || self.num_unread_messages > 0
            || self.num_unread_mentions > 0
            || self.num_unread_notifications > 0
    }
}

/// Computes a room's display name, following the Matrix naming rules:
/// the explicit name, then the canonical alias, then the room's heroes.
fn compute_display_name(raw: &RawRoomEntry) -> String {
    if let Some(name) = raw.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_owned();
    }
    if let Some(alias) = &raw.canonical_alias {
        return alias.to_string();
    }
    match raw.heroes.as_slice() {
        [] => String::from("Empty Room"),
        [only] => only.name().to_owned(),
        [first, second] => format!("{} and {}", first.name(), second.name()),
        [first, second, rest @ ..] => format!(
            "{}, {} and {} other{}",
            first.name(),
            second.name(),
            rest.len(),
            if rest.len() == 1 { "" } else { "s" },
        ),
    }
}
