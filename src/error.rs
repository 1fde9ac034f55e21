//! Error types shared by the room list synchronizer and the timeline processor.

use ruma::OwnedRoomId;

/// The kind of [`UpdateOp`](crate::update_op::UpdateOp) that triggered an error,
/// without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOpKind {
    Set,
    Append,
    PushBack,
    PushFront,
    Insert,
    Remove,
    Reset,
    PopBack,
    PopFront,
    Clear,
    Truncate,
}

impl std::fmt::Display for UpdateOpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// A protocol integrity fault: the upstream source sent something that cannot be
/// applied to the materialized list without desynchronizing it.
///
/// These are never retried or clamped. Once one occurs, the owning list is faulted
/// and stops accepting updates; its last good snapshot remains readable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    #[error("{op} at index {index} is out of bounds for a list of length {len}")]
    IndexOutOfBounds {
        op: UpdateOpKind,
        index: usize,
        len: usize,
    },
    #[error("{op} to length {length} is out of bounds for a list of length {len}")]
    LengthOutOfBounds {
        op: UpdateOpKind,
        length: usize,
        len: usize,
    },
    #[error("{op} on an empty list")]
    EmptyList { op: UpdateOpKind },
    #[error("cannot rebuild room {room_id}: it is not in the materialized list")]
    UnknownEntry { room_id: OwnedRoomId },
    #[error("the list was faulted by an earlier integrity error and no longer accepts updates")]
    Faulted,
}

/// An error returned by a [`RoomEntrySource`](crate::room_list::RoomEntrySource)
/// while re-fetching a single room.
///
/// Rebuild failures are recovered locally: the affected entry is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RebuildError {
    #[error("room {0} was not found by the entry source")]
    NotFound(OwnedRoomId),
    #[error("failed to fetch room {room_id}: {message}")]
    Fetch {
        room_id: OwnedRoomId,
        message: String,
    },
}

/// Why a room list or timeline subscription stopped updating.
///
/// The last published snapshot stays valid (stale, but never incorrect).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StopReason {
    #[error("the upstream update stream ended")]
    StreamEnded,
    #[error("the subscription was shut down")]
    ShutDown,
    #[error("integrity fault: {0}")]
    IntegrityFault(#[from] IntegrityError),
}
