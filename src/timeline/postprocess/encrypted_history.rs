use imbl::Vector;

use super::StageContext;
use crate::timeline::item::{TimelineItem, VirtualTimelineItem};


/// Replaces history that this device can't decrypt with a single banner.
///
/// This only applies to encrypted rooms without key backup, for which the last
/// login time is known. The longest prefix of items sent at or before the last
/// login is replaced by one `EncryptedHistoryBanner`. Items without a timestamp
/// (virtual items) inside that prefix are replaced along with it.
///
/// If nothing qualifies, the given list is returned as-is.
pub fn insert_encrypted_history_banner(items: Vector<TimelineItem>, cx: &StageContext<'_>) -> Vector<TimelineItem> {
    let context = cx.timeline;
    if !context.is_encrypted || context.key_backup_enabled {
        return items;
    }
    let Some(last_login) = context.last_login_timestamp else {
        return items;
    };

    let mut prefix_end = None;
    for (index, item) in items.iter().enumerate() {
        match item.timestamp() {
            Some(timestamp) if timestamp <= last_login => prefix_end = Some(index),
            Some(_) => break,
            None => continue,
        }
    }
    let Some(prefix_end) = prefix_end else {
        return items;
    };

    let mut remaining = items;
    let mut rest = remaining.split_off(prefix_end + 1);
    rest.push_front(TimelineItem::virtual_item(VirtualTimelineItem::EncryptedHistoryBanner));
    rest
}
