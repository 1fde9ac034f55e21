//! The room list synchronizer: keeps a materialized list of [`RoomSummary`]s
//! consistent with the ordered diff stream emitted by the sync engine.

use std::{
    collections::HashMap,
    future::Future,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use eyeball::{ObservableWriteGuard, SharedObservable, Subscriber};
use futures_util::{Stream, StreamExt, future::join_all, pin_mut};
use imbl::Vector;
use ruma::{OwnedRoomId, RoomId};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use crate::{
    error::{IntegrityError, RebuildError, StopReason},
    materialized_list::MaterializedList,
    room::room_summary::{RawRoomEntry, RoomSummary},
    subscription::Subscription,
    update_op::UpdateOp,
};

/// Whether to enable verbose logging of all room list diff updates.
const LOG_ROOM_LIST_DIFFS: bool = cfg!(feature = "log_room_list_diffs");


/// A single item emitted by the upstream room list stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomListInput {
    /// An ordered batch of diffs, applied atomically.
    Diffs(Vec<UpdateOp<RawRoomEntry>>),
    /// The server told us the total number of rooms that can be loaded.
    MaximumNumberOfRooms(u32),
}

/// The loading state of the room list, as seen by consumers.
///
/// There is no "loading" state: loading is signaled purely by new summaries
/// arriving in the summaries observable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomListLoadingState {
    /// No batch has been applied yet.
    NotLoaded,
    /// At least one batch was applied. The server optionally told us
    /// the maximum number of rooms that can be loaded.
    Loaded { maximum_number_of_rooms: Option<u32> },
    /// The list stopped updating. Its last published snapshot remains valid.
    Stopped(StopReason),
}

/// The source used to re-fetch individual rooms by their identity,
/// independently of the diff stream.
pub trait RoomEntrySource: Send + Sync + 'static {
    /// Fetches the current raw entry for the given room.
    ///
    /// Returns [`RebuildError::NotFound`] if the source doesn't know this room.
    fn fetch_room(&self, room_id: &RoomId) -> impl Future<Output = Result<RawRoomEntry, RebuildError>> + Send;
}


/// Maintains a [`MaterializedList`] of room summaries.
///
/// All writes (diff batches and rebuilds) are serialized by the list's writer lock;
/// reads of the published snapshot never wait on a writer.
pub struct RoomListSynchronizer<S> {
    list: MaterializedList<RoomSummary>,
    loading_state: SharedObservable<RoomListLoadingState>,
    maximum_number_of_rooms: Mutex<Option<u32>>,
    has_loaded: AtomicBool,
    entry_source: S,
    /// Serializes rebuilds with each other. This is held across the fetches,
    /// unlike the list's writer lock.
    rebuild_lock: tokio::sync::Mutex<()>,
}

impl<S: RoomEntrySource> RoomListSynchronizer<S> {
    pub fn new(entry_source: S) -> Self {
        Self {
            list: MaterializedList::new(),
            loading_state: SharedObservable::new(RoomListLoadingState::NotLoaded),
            maximum_number_of_rooms: Mutex::new(None),
            has_loaded: AtomicBool::new(false),
            entry_source,
            rebuild_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Returns the last published list of all room summaries.
    pub fn summaries(&self) -> Vector<RoomSummary> {
        self.list.snapshot()
    }

    /// Subscribes to the list of all room summaries (replay-latest).
    pub fn subscribe_summaries(&self) -> Subscriber<Vector<RoomSummary>> {
        self.list.subscribe()
    }

    pub fn loading_state(&self) -> RoomListLoadingState {
        self.loading_state.get()
    }

    pub fn subscribe_loading_state(&self) -> Subscriber<RoomListLoadingState> {
        self.loading_state.subscribe()
    }

    /// Returns the total number of rooms last reported by the server, if any.
    ///
    /// Unlike the loading state, this remains available after the list stops.
    pub fn maximum_number_of_rooms(&self) -> Option<u32> {
        *self.maximum_number_of_rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` if at least one batch of diffs was applied successfully.
    pub fn has_loaded(&self) -> bool {
        self.has_loaded.load(Ordering::SeqCst)
    }

    /// Applies an ordered batch of diffs from the sync engine.
    ///
    /// Each raw entry carried by the batch is converted into a [`RoomSummary`];
    /// entries that the batch doesn't touch are never re-scanned.
    /// On an integrity fault, the list stops updating and the fault is returned.
    pub fn apply_update(&self, ops: Vec<UpdateOp<RawRoomEntry>>) -> Result<(), IntegrityError> {
        if LOG_ROOM_LIST_DIFFS {
            for op in &ops {
                debug!("room_list: diff {} (batch of {})", op.kind(), ops.len());
            }
        }
        let result = self.list.apply(
            ops.into_iter().map(|op| op.map(|raw| RoomSummary::from_raw(&raw)))
        );
        match result {
            Ok(()) => {
                self.has_loaded.store(true, Ordering::SeqCst);
                let maximum_number_of_rooms = self.maximum_number_of_rooms();
                self.set_loading_state(RoomListLoadingState::Loaded { maximum_number_of_rooms });
                if LOG_ROOM_LIST_DIFFS {
                    debug!("room_list: after batch, {} rooms", self.list.snapshot().len());
                }
                Ok(())
            }
            Err(e) => {
                error!("room_list: stopping after integrity fault: {e}");
                self.set_loading_state(RoomListLoadingState::Stopped(e.clone().into()));
                Err(e)
            }
        }
    }

    /// Records the total number of rooms that the server says can be loaded.
    pub fn set_maximum_number_of_rooms(&self, count: u32) {
        *self.maximum_number_of_rooms.lock().unwrap_or_else(PoisonError::into_inner) = Some(count);
        if let RoomListLoadingState::Loaded { .. } = self.loading_state.get() {
            self.set_loading_state(RoomListLoadingState::Loaded { maximum_number_of_rooms: Some(count) });
        }
    }

    /// Sets the loading state, unless the list has already stopped.
    fn set_loading_state(&self, new_state: RoomListLoadingState) {
        let mut state = self.loading_state.write();
        if matches!(*state, RoomListLoadingState::Stopped(_)) {
            return;
        }
        ObservableWriteGuard::set_if_not_eq(&mut state, new_state);
    }

    /// Re-fetches every room currently in the list from the entry source
    /// and replaces each one in place, preserving the list's order and length.
    ///
    /// Rooms that the source can't provide (not found, or a fetch error) are left unchanged.
    /// Rooms removed by a diff batch while their fetch was in flight are skipped.
    /// Returns the number of rooms that were replaced.
    pub async fn rebuild(&self) -> Result<usize, IntegrityError> {
        let _rebuild_guard = self.rebuild_lock.lock().await;
        let room_ids: Vec<OwnedRoomId> = self.list.snapshot()
            .iter()
            .map(|summary| summary.room_id.clone())
            .collect();

        // Fetch outside of the writer lock, such that diff batches can keep flowing.
        let results = join_all(room_ids.iter().map(|room_id| self.entry_source.fetch_room(room_id))).await;
        let fresh: HashMap<OwnedRoomId, RoomSummary> = room_ids.into_iter()
            .zip(results)
            .filter_map(|(room_id, result)| fresh_summary(&room_id, result).map(|summary| (room_id, summary)))
            .collect();

        let replaced = self.list.replace_in_place(|summary| fresh.get(&summary.room_id).cloned())?;
        debug!("room_list: rebuilt {replaced} of {} fetched rooms", fresh.len());
        Ok(replaced)
    }

    /// Re-fetches a single room and replaces it in place.
    ///
    /// Returns `Ok(false)` if the source couldn't provide the room (the entry is then left unchanged).
    ///
    /// A room that isn't in the list is an integrity fault: the list stops updating
    /// and an [`IntegrityError::UnknownEntry`] is returned.
    pub async fn rebuild_entry(&self, room_id: &RoomId) -> Result<bool, IntegrityError> {
        let _rebuild_guard = self.rebuild_lock.lock().await;
        if !self.list.snapshot().iter().any(|summary| summary.room_id == room_id) {
            let e = IntegrityError::UnknownEntry { room_id: room_id.to_owned() };
            error!("room_list: stopping after integrity fault: {e}");
            self.list.record_fault(e.clone());
            self.set_loading_state(RoomListLoadingState::Stopped(e.clone().into()));
            return Err(e);
        }
        let Some(summary) = fresh_summary(room_id, self.entry_source.fetch_room(room_id).await) else {
            return Ok(false);
        };
        let replaced = self.list.replace_in_place(|old| (old.room_id == room_id).then(|| summary.clone()))?;
        Ok(replaced > 0)
    }

    /// Marks this list as stopped for the given reason.
    fn stop(&self, reason: StopReason) {
        warn!("room_list: stopped updating: {reason}");
        self.set_loading_state(RoomListLoadingState::Stopped(reason));
    }
}

impl<S: RoomEntrySource> RoomListSynchronizer<S> {
    /// Spawns a task that applies every item of `updates`, in order, until the stream ends,
    /// an integrity fault occurs, or the returned subscription is shut down.
    ///
    /// This must be called from within a Tokio runtime.
    pub fn spawn(
        self: &Arc<Self>,
        updates: impl Stream<Item = RoomListInput> + Send + 'static,
    ) -> Subscription {
        let synchronizer = Arc::clone(self);
        Subscription::spawn(|shutdown_receiver| async move {
            let reason = synchronizer.drive(updates, shutdown_receiver).await;
            synchronizer.stop(reason);
        })
    }

    async fn drive(
        &self,
        updates: impl Stream<Item = RoomListInput>,
        mut shutdown_receiver: oneshot::Receiver<()>,
    ) -> StopReason {
        pin_mut!(updates);
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown_receiver => return StopReason::ShutDown,
                input = updates.next() => match input {
                    Some(RoomListInput::Diffs(ops)) => {
                        if let Err(e) = self.apply_update(ops) {
                            return e.into();
                        }
                    }
                    Some(RoomListInput::MaximumNumberOfRooms(count)) => self.set_maximum_number_of_rooms(count),
                    None => return StopReason::StreamEnded,
                },
            }
        }
    }
}

fn fresh_summary(room_id: &RoomId, result: Result<RawRoomEntry, RebuildError>) -> Option<RoomSummary> {
    match result {
        Ok(raw) if raw.room_id == room_id => Some(RoomSummary::from_raw(&raw)),
        Ok(raw) => {
            warn!("room_list: rebuild of {room_id} returned a different room {}; leaving it unchanged", raw.room_id);
            None
        }
        Err(e) => {
            warn!("room_list: leaving {room_id} unchanged: {e}");
            None
        }
    }
}
