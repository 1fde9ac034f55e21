use imbl::Vector;

use super::StageContext;
use crate::timeline::item::{TimelineItem, TimelineItemContent};


/// Removes state events whose type should never be shown in the timeline,
/// e.g., power level or join rule changes.
///
/// All other items pass through unchanged and in their original order.
pub fn filter_hidden_state_events(items: Vector<TimelineItem>, _cx: &StageContext<'_>) -> Vector<TimelineItem> {
    if !items.iter().any(is_hidden_state_event) {
        return items;
    }
    items.into_iter().filter(|item| !is_hidden_state_event(item)).collect()
}

fn is_hidden_state_event(item: &TimelineItem) -> bool {
    matches!(
        item.as_event().map(|event| &event.content),
        Some(TimelineItemContent::OtherState { kind, .. }) if kind.is_hidden()
    )
}


#[cfg(test)]
mod tests {
    use super::*;
    use imbl::vector;
    use crate::{
        test_utils::{ids, message, state_event},
        timeline::{
            context::TimelineContext,
            item::{StateEventKind, TimelineItemKind, VirtualTimelineItem},
        },
        utils::millis,
    };

    fn run(items: Vector<TimelineItem>) -> Vector<TimelineItem> {
        let context = TimelineContext::default();
        filter_hidden_state_events(items, &StageContext { timeline: &context, now: millis(0) })
    }

    #[test]
    fn test_hidden_types_are_removed() {
        let alice = "@alice:example.org";
        let items = vector![
            state_event("power", alice, 1, StateEventKind::RoomPowerLevels),
            message("m1", 2),
            state_event("topic", alice, 3, StateEventKind::RoomTopic),
            state_event("acl", alice, 4, StateEventKind::RoomServerAcl),
            state_event("custom", alice, 5, StateEventKind::Custom("org.example.thing".into())),
            state_event("child", alice, 6, StateEventKind::SpaceChild),
            TimelineItem::virtual_item(VirtualTimelineItem::ReadMarker),
            TimelineItem { unique_id: "other".into(), kind: TimelineItemKind::Other },
        ];
        assert_eq!(ids(&run(items)), ["m1", "topic", "custom", "read_marker", "other"]);
    }

    #[test]
    fn test_nothing_hidden_returns_input() {
        let items = vector![
            message("m1", 1),
            state_event("create", "@alice:example.org", 0, StateEventKind::RoomCreate),
        ];
        let output = run(items.clone());
        assert_eq!(output, items);
    }
}
