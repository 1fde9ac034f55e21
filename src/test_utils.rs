//! Builders shared by the unit tests of several modules.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use ruma::{OwnedEventId, OwnedRoomId, OwnedUserId, RoomId};

use crate::{
    error::RebuildError,
    room::room_summary::{RawRoomEntry, RoomMembership, UnreadCounts},
    room_list::RoomEntrySource,
    timeline::item::{
        EventTimelineItem, MembershipChange, MessageContent, MessageKind, RoomMembershipChange,
        StateEventKind, TimelineItem, TimelineItemContent,
    },
    utils,
};

/// Returns a joined room with the given ID and nothing else set.
pub(crate) fn raw_room(room_id: &str) -> RawRoomEntry {
    RawRoomEntry {
        room_id: OwnedRoomId::try_from(room_id).unwrap(),
        name: None,
        canonical_alias: None,
        alt_aliases: Vec::new(),
        avatar_url: None,
        heroes: Vec::new(),
        direct_targets: Vec::new(),
        tags: Vec::new(),
        unread: UnreadCounts::default(),
        marked_unread: false,
        active_call_participants: Vec::new(),
        membership: RoomMembership::Joined,
        latest_event: None,
        notification_mode: None,
        inviter: None,
    }
}

pub(crate) fn named_room(room_id: &str, name: &str) -> RawRoomEntry {
    RawRoomEntry { name: Some(name.to_owned()), ..raw_room(room_id) }
}

/// A [`RoomEntrySource`] backed by an in-memory map that tests can modify.
#[derive(Default)]
pub(crate) struct MapEntrySource {
    pub(crate) rooms: Mutex<HashMap<OwnedRoomId, RawRoomEntry>>,
}

impl MapEntrySource {
    pub(crate) fn insert(&self, raw: RawRoomEntry) {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner).insert(raw.room_id.clone(), raw);
    }
}

impl RoomEntrySource for MapEntrySource {
    async fn fetch_room(&self, room_id: &RoomId) -> Result<RawRoomEntry, RebuildError> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
            .get(room_id)
            .cloned()
            .ok_or_else(|| RebuildError::NotFound(room_id.to_owned()))
    }
}


fn event(id: &str, sender: &str, timestamp: u64, content: TimelineItemContent) -> TimelineItem {
    TimelineItem::event(id, EventTimelineItem {
        event_id: Some(OwnedEventId::try_from(format!("${id}")).unwrap()),
        sender: OwnedUserId::try_from(sender).unwrap(),
        sender_display_name: None,
        timestamp: utils::millis(timestamp),
        content,
    })
}

/// A text message from `@alice:example.org`. Its event ID is `$<id>`.
pub(crate) fn message(id: &str, timestamp: u64) -> TimelineItem {
    message_from(id, "@alice:example.org", timestamp)
}

pub(crate) fn message_from(id: &str, sender: &str, timestamp: u64) -> TimelineItem {
    event(id, sender, timestamp, TimelineItemContent::Message(MessageContent {
        msgtype: MessageKind::Text,
        body: format!("message {id}"),
    }))
}

pub(crate) fn state_event(id: &str, sender: &str, timestamp: u64, kind: StateEventKind) -> TimelineItem {
    event(id, sender, timestamp, TimelineItemContent::OtherState { kind, state_key: String::new() })
}

pub(crate) fn membership_event(id: &str, user: &str, timestamp: u64, change: MembershipChange) -> TimelineItem {
    event(id, user, timestamp, TimelineItemContent::MembershipChange(RoomMembershipChange {
        user_id: OwnedUserId::try_from(user).unwrap(),
        display_name: None,
        change,
    }))
}

/// Returns the unique IDs of the given items, for compact assertions.
pub(crate) fn ids<'a>(items: impl IntoIterator<Item = &'a TimelineItem>) -> Vec<&'a str> {
    items.into_iter().map(|item| item.unique_id.as_str()).collect()
}
