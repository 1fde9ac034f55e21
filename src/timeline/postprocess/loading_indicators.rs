use imbl::Vector;

use super::StageContext;
use crate::timeline::item::{PaginationDirection, TimelineItem, VirtualTimelineItem};


/// Adds loading indicators at either end of an initialized timeline
/// if more items can be paginated in that direction.
///
/// Indicators are always recomputed from the current flags: any indicator
/// already in the list is removed first, so re-running this never duplicates them.
/// A forwards indicator is only added after at least one non-virtual item.
pub fn insert_loading_indicators(items: Vector<TimelineItem>, cx: &StageContext<'_>) -> Vector<TimelineItem> {
    let context = cx.timeline;
    if !context.is_timeline_initialized {
        return items;
    }
    let mut items = if items.iter().any(is_loading_indicator) {
        items.into_iter().filter(|item| !is_loading_indicator(item)).collect()
    } else {
        items
    };

    if context.has_more_forward && items.iter().any(|item| item.as_virtual().is_none()) {
        items.push_back(loading_indicator(PaginationDirection::Forwards, cx));
    }
    if context.has_more_backward {
        items.push_front(loading_indicator(PaginationDirection::Backwards, cx));
    }
    items
}

fn loading_indicator(direction: PaginationDirection, cx: &StageContext<'_>) -> TimelineItem {
    TimelineItem::virtual_item(VirtualTimelineItem::LoadingIndicator { direction, timestamp: cx.now })
}

fn is_loading_indicator(item: &TimelineItem) -> bool {
    matches!(item.as_virtual(), Some(VirtualTimelineItem::LoadingIndicator { .. }))
}
