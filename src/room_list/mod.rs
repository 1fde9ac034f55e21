//! The materialized, filterable, paged list of all rooms.

pub mod dynamic_room_list;
pub mod synchronizer;

pub use dynamic_room_list::{DynamicRoomList, RoomListControl};
pub use synchronizer::{
    RoomEntrySource, RoomListInput, RoomListLoadingState, RoomListSynchronizer,
};
