use std::collections::HashSet;

use imbl::Vector;

use super::StageContext;
use crate::{
    timeline::item::{TimelineItem, VirtualTimelineItem},
    utils::epoch_day,
};


/// Inserts a `DayDivider` before the first event of each new day,
/// and the user's `ReadMarker` right after their fully-read event.
///
/// Existing dividers and read markers are removed first.
/// Each day gets at most one divider, so their IDs stay unique
/// even if events arrive out of order. The read marker is omitted
/// if the fully-read event is the last event, since then nothing is unread.
pub fn insert_day_dividers_and_read_marker(items: Vector<TimelineItem>, cx: &StageContext<'_>) -> Vector<TimelineItem> {
    let context = cx.timeline;
    if !context.day_dividers {
        return items;
    }
    let fully_read_event_id = context.fully_read_event_id.as_deref();
    let last_event_index = items.iter().rposition(|item| item.as_event().is_some());

    let mut output = Vector::new();
    let mut current_day = None;
    let mut days_with_divider = HashSet::new();
    for (index, item) in items.into_iter().enumerate() {
        if matches!(item.as_virtual(), Some(VirtualTimelineItem::DayDivider(_) | VirtualTimelineItem::ReadMarker)) {
            continue;
        }
        if let Some(day) = item.timestamp().and_then(|ts| epoch_day(ts, context.utc_offset_seconds))
            && current_day != Some(day)
        {
            current_day = Some(day);
            if days_with_divider.insert(day) {
                output.push_back(TimelineItem::virtual_item(VirtualTimelineItem::DayDivider(day)));
            }
        }
        let is_fully_read = fully_read_event_id.is_some_and(|fully_read| {
            item.as_event().and_then(|event| event.event_id.as_deref()) == Some(fully_read)
        });
        output.push_back(item);
        if is_fully_read && Some(index) != last_event_index {
            output.push_back(TimelineItem::virtual_item(VirtualTimelineItem::ReadMarker));
        }
    }
    output
}
