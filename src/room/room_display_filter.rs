use std::{fmt, ops::Deref};

use serde::{Deserialize, Serialize};

use crate::{
    room::room_summary::{RoomMembership, RoomSummary},
    utils::normalize_for_matching,
};


/// The kind of room matched by [`RoomListFilter::Category`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomCategory {
    /// Rooms that are not direct (1:1) chats.
    Group,
    /// Direct (1:1) chats.
    People,
}

/// A declarative, pure predicate over [`RoomSummary`]s.
///
/// Filters never mutate the list they are applied to and cannot fail.
/// Compile one into a [`RoomDisplayFilter`] to evaluate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomListFilter {
    /// Matches only if every sub-filter matches. `All([])` matches every room.
    All(Vec<RoomListFilter>),
    /// Matches if at least one sub-filter matches. `Any([])` matches no room.
    Any(Vec<RoomListFilter>),
    /// Matches no room.
    None,
    Category(RoomCategory),
    Favorite,
    /// Matches rooms with unread messages, mentions, or notifications, or that are marked as unread.
    Unread,
    /// Matches rooms that the user has been invited to.
    Invite,
    /// Matches rooms whose display name contains the given pattern,
    /// ignoring case and diacritics.
    NormalizedMatchRoomName(String),
}

impl RoomListFilter {
    /// Returns a filter that matches every room.
    pub fn all() -> Self {
        RoomListFilter::All(Vec::new())
    }

    /// Evaluates this filter against the given room.
    ///
    /// Prefer compiling a [`RoomDisplayFilter`] when evaluating many rooms,
    /// as that normalizes name patterns only once.
    pub fn matches(&self, room: &RoomSummary) -> bool {
        RoomDisplayFilter::from(self)(room)
    }
}

impl Default for RoomListFilter {
    fn default() -> Self {
        Self::all()
    }
}


type FilterFn = dyn Fn(&RoomSummary) -> bool + Send + Sync;

/// A filter function that is called for each room to determine whether it should be displayed.
///
/// If the function returns `true`, the room is displayed; otherwise, it is not shown.
/// The default value is a filter function that always returns `true`.
///
/// ## Example
/// ```rust
/// use robrix_sync_core::room::room_display_filter::{RoomCategory, RoomDisplayFilter, RoomListFilter};
///
/// let filter = RoomDisplayFilter::from(&RoomListFilter::All(vec![
///     RoomListFilter::Category(RoomCategory::People),
///     RoomListFilter::Unread,
/// ]));
/// # let rooms: Vec<robrix_sync_core::room::room_summary::RoomSummary> = Vec::new();
/// let unread_dms: Vec<_> = rooms.iter().filter(|&room| filter(room)).collect();
/// # assert!(unread_dms.is_empty());
/// ```
pub struct RoomDisplayFilter(Box<FilterFn>);
impl Default for RoomDisplayFilter {
    fn default() -> Self {
        RoomDisplayFilter(Box::new(|_: &RoomSummary| true))
    }
}
impl Deref for RoomDisplayFilter {
    type Target = Box<FilterFn>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl fmt::Debug for RoomDisplayFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RoomDisplayFilter(..)")
    }
}

impl From<&RoomListFilter> for RoomDisplayFilter {
    fn from(filter: &RoomListFilter) -> Self {
        RoomDisplayFilter(compile(filter))
    }
}

fn compile(filter: &RoomListFilter) -> Box<FilterFn> {
    match filter {
        RoomListFilter::All(filters) => {
            let filters: Vec<_> = filters.iter().map(compile).collect();
            Box::new(move |room: &RoomSummary| filters.iter().all(|f| f(room)))
        }
        RoomListFilter::Any(filters) => {
            let filters: Vec<_> = filters.iter().map(compile).collect();
            Box::new(move |room: &RoomSummary| filters.iter().any(|f| f(room)))
        }
        RoomListFilter::None => Box::new(|_: &RoomSummary| false),
        RoomListFilter::Category(RoomCategory::Group) => Box::new(|room: &RoomSummary| !room.is_direct),
        RoomListFilter::Category(RoomCategory::People) => Box::new(|room: &RoomSummary| room.is_direct),
        RoomListFilter::Favorite => Box::new(|room: &RoomSummary| room.is_favorite),
        RoomListFilter::Unread => Box::new(|room: &RoomSummary| room.is_unread()),
        RoomListFilter::Invite => Box::new(|room: &RoomSummary| room.membership == RoomMembership::Invited),
        RoomListFilter::NormalizedMatchRoomName(pattern) => {
            let pattern = normalize_for_matching(pattern);
            if pattern.is_empty() {
                return Box::new(|_: &RoomSummary| true);
            }
            Box::new(move |room: &RoomSummary| normalize_for_matching(&room.display_name).contains(&pattern))
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{room::room_summary::{RawRoomEntry, FAVOURITE_TAG}, test_utils::raw_room};
    use ruma::user_id;

    fn summary(raw: RawRoomEntry) -> RoomSummary {
        RoomSummary::from_raw(&raw)
    }

    fn rooms() -> Vec<RoomSummary> {
        let mut fav_unread = raw_room("!fav_unread:example.org");
        fav_unread.tags = vec![FAVOURITE_TAG.into()];
        fav_unread.marked_unread = true;
        fav_unread.name = Some("Café Society".into());

        let mut fav = raw_room("!fav:example.org");
        fav.tags = vec![FAVOURITE_TAG.into()];
        fav.name = Some("Rust".into());

        let mut dm = raw_room("!dm:example.org");
        dm.direct_targets = vec![user_id!("@bob:example.org").to_owned()];
        dm.unread.messages = 2;
        dm.name = Some("Bob".into());

        let mut invite = raw_room("!invite:example.org");
        invite.membership = RoomMembership::Invited;
        invite.name = Some("Invitation".into());

        vec![summary(fav_unread), summary(fav), summary(dm), summary(invite)]
    }

    fn matching(filter: RoomListFilter) -> Vec<String> {
        let filter = RoomDisplayFilter::from(&filter);
        rooms().into_iter()
            .filter(|room| filter(room))
            .map(|room| room.room_id.to_string())
            .collect()
    }

    #[test]
    fn test_empty_composites() {
        assert_eq!(matching(RoomListFilter::All(vec![])).len(), 4);
        assert!(matching(RoomListFilter::Any(vec![])).is_empty());
        assert!(matching(RoomListFilter::None).is_empty());
        assert_eq!(matching(RoomListFilter::default()).len(), 4);
    }

    #[test]
    fn test_conjunction_and_disjunction() {
        assert_eq!(
            matching(RoomListFilter::All(vec![RoomListFilter::Favorite, RoomListFilter::Unread])),
            vec!["!fav_unread:example.org"],
        );
        assert_eq!(
            matching(RoomListFilter::Any(vec![RoomListFilter::Invite, RoomListFilter::Category(RoomCategory::People)])),
            vec!["!dm:example.org", "!invite:example.org"],
        );
    }

    #[test]
    fn test_categories() {
        assert_eq!(matching(RoomListFilter::Category(RoomCategory::People)), vec!["!dm:example.org"]);
        assert_eq!(matching(RoomListFilter::Category(RoomCategory::Group)).len(), 3);
    }

    #[test]
    fn test_normalized_name_match() {
        assert_eq!(
            matching(RoomListFilter::NormalizedMatchRoomName("CAFE".into())),
            vec!["!fav_unread:example.org"],
        );
        assert_eq!(matching(RoomListFilter::NormalizedMatchRoomName("   ".into())).len(), 4);
        assert!(matching(RoomListFilter::NormalizedMatchRoomName("nothing".into())).is_empty());
    }

    #[test]
    fn test_filter_serde() {
        let filter: RoomListFilter = serde_json::from_str(
            r#"{"all": [{"category": "people"}, "unread", {"normalized_match_room_name": "bob"}]}"#
        ).unwrap();
        assert_eq!(filter, RoomListFilter::All(vec![
            RoomListFilter::Category(RoomCategory::People),
            RoomListFilter::Unread,
            RoomListFilter::NormalizedMatchRoomName("bob".into()),
        ]));
        assert_eq!(matching(filter), vec!["!dm:example.org"]);
    }
}
