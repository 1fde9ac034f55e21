use imbl::Vector;
use ruma::UserId;

use super::StageContext;
use crate::timeline::{
    context::TimelineMode,
    item::{MembershipChange, StateEventKind, TimelineItem, TimelineItemContent, VirtualTimelineItem},
};


/// Handles the very beginning of a room's history, once the timeline reaches it.
///
/// * In a direct room, the creator's "created this room" and "joined" pair
///   is redundant, so both are removed (along with any `RoomBeginning` item),
///   but only if both were sent by the known room creator.
///   If anything doesn't match, the list is left as-is.
/// * In any other room, a single `RoomBeginning` item is prepended.
///
/// This does nothing for pinned-events timelines, which have no real beginning.
pub fn trim_room_beginning(items: Vector<TimelineItem>, cx: &StageContext<'_>) -> Vector<TimelineItem> {
    let context = cx.timeline;
    if !context.is_at_start_of_timeline || context.mode == TimelineMode::PinnedEvents {
        return items;
    }
    if context.is_direct {
        match context.room_creator.as_deref() {
            Some(creator) => trim_dm_beginning(items, creator),
            None => items,
        }
    } else {
        prepend_room_beginning(items)
    }
}

fn trim_dm_beginning(items: Vector<TimelineItem>, creator: &UserId) -> Vector<TimelineItem> {
    let Some(create_index) = items.iter().position(is_room_create_event) else {
        return items;
    };
    if items.get(create_index).and_then(TimelineItem::as_event).is_none_or(|event| event.sender != creator) {
        return items;
    }
    let Some(join_index) = items.iter()
        .skip(create_index + 1)
        .position(is_join_event)
        .map(|offset| create_index + 1 + offset)
    else {
        return items;
    };
    if items.get(join_index).and_then(TimelineItem::as_event).is_none_or(|event| event.sender != creator) {
        return items;
    }

    items.into_iter()
        .enumerate()
        .filter(|(index, item)| {
            *index != create_index
                && *index != join_index
                && !matches!(item.as_virtual(), Some(VirtualTimelineItem::RoomBeginning))
        })
        .map(|(_, item)| item)
        .collect()
}

fn prepend_room_beginning(mut items: Vector<TimelineItem>) -> Vector<TimelineItem> {
    if !items.iter().any(|item| matches!(item.as_virtual(), Some(VirtualTimelineItem::RoomBeginning))) {
        items.push_front(TimelineItem::virtual_item(VirtualTimelineItem::RoomBeginning));
    }
    items
}

fn is_room_create_event(item: &TimelineItem) -> bool {
    matches!(
        item.as_event().map(|event| &event.content),
        Some(TimelineItemContent::OtherState { kind: StateEventKind::RoomCreate, .. })
    )
}

fn is_join_event(item: &TimelineItem) -> bool {
    matches!(
        item.as_event().map(|event| &event.content),
        Some(TimelineItemContent::MembershipChange(change)) if change.change == MembershipChange::Joined
    )
}
