use imbl::Vector;

use super::StageContext;
use crate::timeline::{
    context::TimelineMode,
    item::{TimelineItem, VirtualTimelineItem},
};


/// In a timeline focused on an event, marks the end of what was loaded
/// by appending a `LastForwardIndicator` anchored on the current last item.
///
/// The indicator's ID is derived from its anchor's ID, so an unchanged tail
/// yields an identical indicator. Any previous indicator is removed first.
pub fn insert_last_forward_indicator(items: Vector<TimelineItem>, cx: &StageContext<'_>) -> Vector<TimelineItem> {
    let context = cx.timeline;
    if context.mode != TimelineMode::FocusedOnEvent || !context.is_timeline_initialized {
        return items;
    }
    let mut items = if items.iter().any(is_last_forward_indicator) {
        items.into_iter().filter(|item| !is_last_forward_indicator(item)).collect()
    } else {
        items
    };
    if let Some(anchor) = items.last() {
        let indicator = TimelineItem::last_forward_indicator(&anchor.unique_id);
        items.push_back(indicator);
    }
    items
}

fn is_last_forward_indicator(item: &TimelineItem) -> bool {
    matches!(item.as_virtual(), Some(VirtualTimelineItem::LastForwardIndicator))
}


#[cfg(test)]
mod tests {
    use super::*;
    use imbl::vector;
    use crate::{
        test_utils::{ids, message},
        timeline::context::TimelineContext,
        utils::millis,
    };

    fn focused() -> TimelineContext {
        TimelineContext {
            mode: TimelineMode::FocusedOnEvent,
            is_timeline_initialized: true,
            ..Default::default()
        }
    }

    fn run(items: Vector<TimelineItem>, context: &TimelineContext) -> Vector<TimelineItem> {
        insert_last_forward_indicator(items, &StageContext { timeline: context, now: millis(0) })
    }

    #[test]
    fn test_indicator_encodes_preceding_item() {
        let output = run(vector![message("a", 1), message("b", 2)], &focused());
        assert_eq!(ids(&output), ["a", "b", "last_forward_indicator_b"]);
        let last = output.last().unwrap();
        assert_eq!(last.as_virtual(), Some(&VirtualTimelineItem::LastForwardIndicator));
    }

    #[test]
    fn test_extended_tail_moves_indicator() {
        let once = run(vector![message("a", 1)], &focused());
        assert_eq!(run(once.clone(), &focused()), once);

        let mut extended = once;
        extended.push_back(message("b", 2));
        assert_eq!(ids(&run(extended, &focused())), ["a", "b", "last_forward_indicator_b"]);
    }

    #[test]
    fn test_other_modes_and_empty_lists() {
        assert!(run(Vector::new(), &focused()).is_empty());

        let items = vector![message("a", 1)];
        let live = TimelineContext { mode: TimelineMode::Live, ..focused() };
        assert_eq!(run(items.clone(), &live), items);
        let uninitialized = TimelineContext { is_timeline_initialized: false, ..focused() };
        assert_eq!(run(items.clone(), &uninitialized), items);
    }
}
