//! The dynamic filter and paging controller that sits in front of a [`RoomListSynchronizer`].
//!
//! A [`DynamicRoomList`] only ever reads snapshots of the materialized room list
//! and writes [`RoomListControl`] messages to the upstream source;
//! it never modifies the list itself.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicUsize, Ordering},
};

use eyeball::{SharedObservable, Subscriber};
use imbl::Vector;
use serde::Serialize;
use tokio::{
    sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{
    config::RoomListConfig,
    error::IntegrityError,
    room::{
        room_display_filter::{RoomDisplayFilter, RoomListFilter},
        room_summary::RoomSummary,
    },
    room_list::synchronizer::{RoomEntrySource, RoomListLoadingState, RoomListSynchronizer},
};


/// A control message sent to the upstream room list source.
///
/// These are delivered over an unbounded channel in the exact order they were issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomListControl {
    /// The kind of filter applied to the room list changed.
    SetFilter(RoomListFilter),
    /// Request one more page of `page_size` rooms.
    AddOnePage { page_size: usize },
    /// Shrink the requested range back to exactly one page of `page_size` rooms.
    ResetToOnePage { page_size: usize },
}

/// The currently-active filter, in both its declarative and compiled forms.
struct ActiveFilter {
    filter: RoomListFilter,
    compiled: RoomDisplayFilter,
}

/// The state shared between a [`DynamicRoomList`] and its background recompute task.
struct FilterState {
    /// Held for the entirety of a recomputation, such that the last published
    /// filtered list always reflects the latest filter and the latest snapshot.
    active: Mutex<ActiveFilter>,
    all_rooms: Subscriber<Vector<RoomSummary>>,
    filtered_rooms: SharedObservable<Vector<RoomSummary>>,
}

impl FilterState {
    fn recompute(&self) {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        let filtered: Vector<RoomSummary> = self.all_rooms.get()
            .iter()
            .filter(|&room| (active.compiled)(room))
            .cloned()
            .collect();
        self.filtered_rooms.set(filtered);
    }
}


/// A filtered, paged view of the room list.
///
/// Requires a Tokio runtime, as it spawns a task that keeps the
/// filtered list up to date with every new room list snapshot.
pub struct DynamicRoomList {
    state: Arc<FilterState>,
    loading_state: Subscriber<RoomListLoadingState>,
    page_size: usize,
    /// The number of pages requested from the upstream source so far.
    page_count: AtomicUsize,
    control_sender: UnboundedSender<RoomListControl>,
    recompute_task: JoinHandle<()>,
}

impl DynamicRoomList {
    /// Creates a new dynamic view of the given synchronizer's room list.
    ///
    /// Returns the receiving end of the control channel, which the upstream
    /// source should drain in order.
    pub fn new<S: RoomEntrySource>(
        synchronizer: &RoomListSynchronizer<S>,
        config: &RoomListConfig,
    ) -> (Self, UnboundedReceiver<RoomListControl>) {
        Self::from_subscribers(
            synchronizer.subscribe_summaries(),
            synchronizer.subscribe_loading_state(),
            config,
        )
    }

    /// Creates a new dynamic view over any observable room list.
    pub fn from_subscribers(
        all_rooms: Subscriber<Vector<RoomSummary>>,
        loading_state: Subscriber<RoomListLoadingState>,
        config: &RoomListConfig,
    ) -> (Self, UnboundedReceiver<RoomListControl>) {
        let (control_sender, control_receiver) = unbounded_channel();
        let filter = config.initial_filter.clone();
        let state = Arc::new(FilterState {
            active: Mutex::new(ActiveFilter { compiled: RoomDisplayFilter::from(&filter), filter }),
            all_rooms: all_rooms.clone(),
            filtered_rooms: SharedObservable::new(Vector::new()),
        });
        state.recompute();

        let recompute_task = tokio::spawn(recompute_on_change(Arc::clone(&state), all_rooms));
        let dynamic_room_list = Self {
            state,
            loading_state,
            page_size: config.page_size.max(1),
            page_count: AtomicUsize::new(1),
            control_sender,
            recompute_task,
        };
        (dynamic_room_list, control_receiver)
    }

    /// Returns the current filtered list of rooms.
    pub fn filtered_rooms(&self) -> Vector<RoomSummary> {
        self.state.filtered_rooms.get()
    }

    /// Subscribes to the filtered list of rooms (replay-latest).
    ///
    /// A new value is published whenever either the room list or the filter changes.
    pub fn subscribe_filtered_rooms(&self) -> Subscriber<Vector<RoomSummary>> {
        self.state.filtered_rooms.subscribe()
    }

    /// Returns the current list of all rooms, unfiltered.
    pub fn all_rooms(&self) -> Vector<RoomSummary> {
        self.state.all_rooms.get()
    }

    pub fn loading_state(&self) -> RoomListLoadingState {
        self.loading_state.get()
    }

    pub fn subscribe_loading_state(&self) -> Subscriber<RoomListLoadingState> {
        self.loading_state.clone()
    }

    /// Returns the currently-active filter.
    pub fn filter(&self) -> RoomListFilter {
        self.state.active.lock().unwrap_or_else(PoisonError::into_inner).filter.clone()
    }

    /// Returns the number of pages requested from the upstream source.
    pub fn page_count(&self) -> usize {
        self.page_count.load(Ordering::SeqCst)
    }

    /// Replaces the active filter and immediately recomputes the filtered list
    /// against the current room list snapshot.
    ///
    /// The new filter kind is also forwarded upstream.
    pub fn update_filter(&self, filter: RoomListFilter) {
        {
            let mut active = self.state.active.lock().unwrap_or_else(PoisonError::into_inner);
            active.compiled = RoomDisplayFilter::from(&filter);
            active.filter = filter.clone();
        }
        self.state.recompute();
        debug!("room_list: filter changed to {filter:?}");
        self.send_control(RoomListControl::SetFilter(filter));
    }

    /// Requests one more page of rooms from the upstream source.
    ///
    /// The new rooms arrive later through the synchronizer's normal update stream.
    pub fn load_more(&self) {
        let page_count = self.page_count.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("room_list: requesting page {page_count}");
        self.send_control(RoomListControl::AddOnePage { page_size: self.page_size });
    }

    /// Asks the upstream source to rewind to exactly one page,
    /// e.g., when nobody is looking at a large paged view anymore.
    pub fn reset(&self) {
        self.page_count.store(1, Ordering::SeqCst);
        self.send_control(RoomListControl::ResetToOnePage { page_size: self.page_size });
    }

    /// Rebuilds every room summary in the underlying synchronizer from its entry source.
    ///
    /// The filtered list is recomputed automatically once the rebuilt list is published.
    pub async fn rebuild_summaries<S: RoomEntrySource>(
        &self,
        synchronizer: &RoomListSynchronizer<S>,
    ) -> Result<usize, IntegrityError> {
        synchronizer.rebuild().await
    }

    fn send_control(&self, control: RoomListControl) {
        if let Err(e) = self.control_sender.send(control) {
            warn!("room_list: upstream control channel is closed, dropping {:?}", e.0);
        }
    }
}

impl Drop for DynamicRoomList {
    fn drop(&mut self) {
        self.recompute_task.abort();
    }
}

async fn recompute_on_change(state: Arc<FilterState>, mut all_rooms: Subscriber<Vector<RoomSummary>>) {
    while all_rooms.next().await.is_some() {
        state.recompute();
    }
}
