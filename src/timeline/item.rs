//! The items that make up a room's timeline, both real events and
//! virtual (presentation-only) items injected by the postprocessing pipeline.

use std::fmt;

use ruma::{MilliSecondsSinceUnixEpoch, OwnedEventId, OwnedUserId};
use serde::{Deserialize, Serialize};


/// A stable identifier for a timeline item, used by diffing UI layers
/// to decide whether an item has changed.
///
/// For virtual items this is always derived deterministically from the item's
/// kind and anchor, never from a counter or random source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimelineUniqueId(pub String);

impl TimelineUniqueId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TimelineUniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TimelineUniqueId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}


/// A single entry in a room's timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineItem {
    pub unique_id: TimelineUniqueId,
    pub kind: TimelineItemKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineItemKind {
    /// A real event, either received from the server or a local echo.
    Event(EventTimelineItem),
    /// An item injected for presentation purposes only; never persisted.
    Virtual(VirtualTimelineItem),
    /// An opaque item that is passed through untouched.
    Other,
}

impl TimelineItem {
    pub fn event(unique_id: impl Into<TimelineUniqueId>, event: EventTimelineItem) -> Self {
        Self { unique_id: unique_id.into(), kind: TimelineItemKind::Event(event) }
    }

    /// Creates a virtual item whose id is derived from its kind.
    ///
    /// Use [`TimelineItem::last_forward_indicator()`] for the one virtual item
    /// whose id also depends on its anchor.
    pub fn virtual_item(item: VirtualTimelineItem) -> Self {
        let unique_id = match &item {
            VirtualTimelineItem::RoomBeginning => TimelineUniqueId::from("room_beginning"),
            VirtualTimelineItem::DayDivider(day) => TimelineUniqueId(format!("day_divider_{day}")),
            VirtualTimelineItem::LoadingIndicator { direction: PaginationDirection::Backwards, .. } => {
                TimelineUniqueId::from("BackwardLoadingIndicator")
            }
            VirtualTimelineItem::LoadingIndicator { direction: PaginationDirection::Forwards, .. } => {
                TimelineUniqueId::from("ForwardLoadingIndicator")
            }
            VirtualTimelineItem::LastForwardIndicator => TimelineUniqueId::from("last_forward_indicator"),
            VirtualTimelineItem::EncryptedHistoryBanner => TimelineUniqueId::from("encrypted_history_banner"),
            VirtualTimelineItem::ReadMarker => TimelineUniqueId::from("read_marker"),
        };
        Self { unique_id, kind: TimelineItemKind::Virtual(item) }
    }

    /// Creates a last-forward indicator anchored on the item with the given id.
    pub fn last_forward_indicator(anchor: &TimelineUniqueId) -> Self {
        Self {
            unique_id: TimelineUniqueId(format!("last_forward_indicator_{anchor}")),
            kind: TimelineItemKind::Virtual(VirtualTimelineItem::LastForwardIndicator),
        }
    }

    pub fn as_event(&self) -> Option<&EventTimelineItem> {
        match &self.kind {
            TimelineItemKind::Event(event) => Some(event),
            _ => None,
        }
    }

    pub fn as_virtual(&self) -> Option<&VirtualTimelineItem> {
        match &self.kind {
            TimelineItemKind::Virtual(virtual_item) => Some(virtual_item),
            _ => None,
        }
    }

    /// Returns the origin timestamp of this item, if it is an event.
    pub fn timestamp(&self) -> Option<MilliSecondsSinceUnixEpoch> {
        self.as_event().map(|event| event.timestamp)
    }
}


/// The direction in which a timeline can be paginated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationDirection {
    Forwards,
    Backwards,
}

impl fmt::Display for PaginationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forwards => write!(f, "forwards"),
            Self::Backwards => write!(f, "backwards"),
        }
    }
}


/// A timeline item that doesn't correspond to an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VirtualTimelineItem {
    /// The very beginning of the room's history.
    RoomBeginning,
    /// A divider between events of two days.
    ///
    /// The value is the number of days since the Unix Epoch, in the configured time zone.
    DayDivider(i64),
    /// More items can be loaded in the given `direction`.
    LoadingIndicator {
        direction: PaginationDirection,
        timestamp: MilliSecondsSinceUnixEpoch,
    },
    /// Marks the newest item that was known when the timeline was focused on an event.
    LastForwardIndicator,
    /// Stands in for history that this device cannot decrypt.
    EncryptedHistoryBanner,
    /// The user's own read marker.
    ReadMarker,
}


/// A real timeline event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTimelineItem {
    /// The event's ID. This is `None` for local echoes that haven't been sent yet.
    #[serde(default)]
    pub event_id: Option<OwnedEventId>,
    pub sender: OwnedUserId,
    #[serde(default)]
    pub sender_display_name: Option<String>,
    pub timestamp: MilliSecondsSinceUnixEpoch,
    pub content: TimelineItemContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineItemContent {
    Message(MessageContent),
    RedactedMessage,
    UnableToDecrypt,
    Sticker { body: String },
    Poll { question: String },
    CallInvite,
    MembershipChange(RoomMembershipChange),
    ProfileChange {
        user_id: OwnedUserId,
        #[serde(default)]
        old_display_name: Option<String>,
        #[serde(default)]
        new_display_name: Option<String>,
    },
    /// Any other state event, e.g., a change of the room's name or topic.
    OtherState {
        kind: StateEventKind,
        #[serde(default)]
        state_key: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
    pub msgtype: MessageKind,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Emote,
    Notice,
    Image,
    Video,
    Audio,
    File,
    Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMembershipChange {
    /// The user whose membership changed.
    pub user_id: OwnedUserId,
    #[serde(default)]
    pub display_name: Option<String>,
    pub change: MembershipChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipChange {
    Joined,
    Left,
    Invited,
    InvitationAccepted,
    InvitationRejected,
    InvitationRevoked,
    Kicked,
    Banned,
    Unbanned,
    KickedAndBanned,
    Knocked,
}


/// The type of a state event shown as [`TimelineItemContent::OtherState`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateEventKind {
    RoomAliases,
    RoomAvatar,
    RoomCanonicalAlias,
    RoomCreate,
    RoomEncryption,
    RoomGuestAccess,
    RoomHistoryVisibility,
    RoomJoinRules,
    RoomName,
    RoomPinnedEvents,
    RoomPowerLevels,
    RoomServerAcl,
    RoomThirdPartyInvite,
    RoomTombstone,
    RoomTopic,
    SpaceChild,
    SpaceParent,
    PolicyRuleRoom,
    PolicyRuleServer,
    PolicyRuleUser,
    /// A state event type that isn't known to this crate.
    Custom(String),
}

impl StateEventKind {
    /// Whether events of this type should be hidden from the displayed timeline.
    pub fn is_hidden(&self) -> bool {
        match self {
            Self::RoomAliases
            | Self::RoomCanonicalAlias
            | Self::RoomGuestAccess
            | Self::RoomHistoryVisibility
            | Self::RoomJoinRules
            | Self::RoomPinnedEvents
            | Self::RoomPowerLevels
            | Self::RoomServerAcl
            | Self::RoomTombstone
            | Self::SpaceChild
            | Self::SpaceParent
            | Self::PolicyRuleRoom
            | Self::PolicyRuleServer
            | Self::PolicyRuleUser => true,
            Self::RoomAvatar
            | Self::RoomCreate
            | Self::RoomEncryption
            | Self::RoomName
            | Self::RoomThirdPartyInvite
            | Self::RoomTopic
            | Self::Custom(_) => false,
        }
    }

    /// Returns the Matrix event type string for this kind.
    pub fn event_type(&self) -> &str {
        match self {
            Self::RoomAliases => "m.room.aliases",
            Self::RoomAvatar => "m.room.avatar",
            Self::RoomCanonicalAlias => "m.room.canonical_alias",
            Self::RoomCreate => "m.room.create",
            Self::RoomEncryption => "m.room.encryption",
            Self::RoomGuestAccess => "m.room.guest_access",
            Self::RoomHistoryVisibility => "m.room.history_visibility",
            Self::RoomJoinRules => "m.room.join_rules",
            Self::RoomName => "m.room.name",
            Self::RoomPinnedEvents => "m.room.pinned_events",
            Self::RoomPowerLevels => "m.room.power_levels",
            Self::RoomServerAcl => "m.room.server_acl",
            Self::RoomThirdPartyInvite => "m.room.third_party_invite",
            Self::RoomTombstone => "m.room.tombstone",
            Self::RoomTopic => "m.room.topic",
            Self::SpaceChild => "m.space.child",
            Self::SpaceParent => "m.space.parent",
            Self::PolicyRuleRoom => "m.policy.rule.room",
            Self::PolicyRuleServer => "m.policy.rule.server",
            Self::PolicyRuleUser => "m.policy.rule.user",
            Self::Custom(event_type) => event_type,
        }
    }
}
