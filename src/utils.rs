use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use ruma::{MilliSecondsSinceUnixEpoch, UInt};
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;


/// Converts a Matrix timestamp into a `DateTime` in the given fixed-offset time zone.
pub fn unix_time_millis_to_datetime(
    millis: MilliSecondsSinceUnixEpoch,
    offset: FixedOffset,
) -> Option<DateTime<FixedOffset>> {
    let millis = i64::try_from(u64::from(millis.get())).ok()?;
    Utc.timestamp_millis_opt(millis).single().map(|dt| dt.with_timezone(&offset))
}

/// Returns the number of whole days between the Unix Epoch and the given timestamp,
/// as observed in the time zone with the given `utc_offset_seconds`.
///
/// Returns `None` if the offset is out of range or the timestamp can't be represented.
pub fn epoch_day(millis: MilliSecondsSinceUnixEpoch, utc_offset_seconds: i32) -> Option<i64> {
    let offset = FixedOffset::east_opt(utc_offset_seconds)?;
    let local = unix_time_millis_to_datetime(millis, offset)?;
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    Some(local.date_naive().signed_duration_since(epoch).num_days())
}

/// Creates a `MilliSecondsSinceUnixEpoch` from a plain millisecond count, saturating on overflow.
pub fn millis(ms: u64) -> MilliSecondsSinceUnixEpoch {
    MilliSecondsSinceUnixEpoch(UInt::new_saturating(ms))
}

/// Returns the first grapheme of the given room name, used as a text avatar
/// for rooms that don't have an avatar image.
///
/// Leading `#` and `@` sigils (from aliases and user IDs) are skipped.
pub fn avatar_from_room_name(room_name: &str) -> String {
    room_name
        .trim_start_matches(['#', '@'])
        .graphemes(true)
        .next()
        .map(|g| g.to_uppercase())
        .unwrap_or_default()
}

/// Normalizes the given text for loose, user-facing matching:
/// decomposes it (NFD), drops all combining marks (e.g., accents),
/// lowercases it, and trims surrounding whitespace.
///
/// For example, `"  Café Crème "` becomes `"cafe creme"`.
pub fn normalize_for_matching(text: &str) -> String {
    text.trim()
        .nfd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}
