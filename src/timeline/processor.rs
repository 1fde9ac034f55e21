//! Drives a room's raw timeline diff stream through the postprocessing pipeline.

use std::sync::{Arc, Mutex, PoisonError};

use eyeball::{ObservableWriteGuard, SharedObservable, Subscriber};
use futures_util::{Stream, StreamExt, pin_mut};
use imbl::Vector;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use crate::{
    error::{IntegrityError, StopReason},
    materialized_list::MaterializedList,
    subscription::Subscription,
    timeline::{
        context::TimelineContext,
        item::TimelineItem,
        postprocess::{Clock, SystemClock, TimelinePipeline},
    },
    update_op::UpdateOp,
};

/// Whether to enable verbose logging of all timeline diff updates.
const LOG_TIMELINE_DIFFS: bool = cfg!(feature = "log_timeline_diffs");


/// A single item emitted by the upstream timeline stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineInput {
    /// An ordered batch of diffs to the raw timeline, applied atomically.
    Diffs(Vec<UpdateOp<TimelineItem>>),
    /// The room's context flags changed, e.g., pagination reached the start of the room.
    Context(TimelineContext),
}

/// Whether a timeline is still being kept up to date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineStatus {
    Live,
    /// The timeline stopped updating. Its last published items remain valid.
    Stopped(StopReason),
}


/// Maintains a room's raw timeline and its postprocessed, displayable counterpart.
///
/// The displayable items are recomputed whenever the raw timeline or the
/// context changes, and are published only once per change.
pub struct TimelineProcessor {
    raw: MaterializedList<TimelineItem>,
    context: SharedObservable<TimelineContext>,
    /// Held for an entire pipeline run, such that the last published items
    /// always reflect the latest raw timeline and the latest context.
    pipeline: Mutex<TimelinePipeline>,
    items: SharedObservable<Vector<TimelineItem>>,
    status: SharedObservable<TimelineStatus>,
}

impl TimelineProcessor {
    pub fn new(context: TimelineContext) -> Self {
        Self::with_clock(context, Arc::new(SystemClock))
    }

    /// Creates a processor whose loading indicators are timestamped by the given clock.
    pub fn with_clock(context: TimelineContext, clock: Arc<dyn Clock>) -> Self {
        let processor = Self {
            raw: MaterializedList::new(),
            context: SharedObservable::new(context),
            pipeline: Mutex::new(TimelinePipeline::with_clock(clock)),
            items: SharedObservable::new(Vector::new()),
            status: SharedObservable::new(TimelineStatus::Live),
        };
        processor.reprocess();
        processor
    }

    /// Returns the current displayable timeline items.
    pub fn items(&self) -> Vector<TimelineItem> {
        self.items.get()
    }

    /// Subscribes to the displayable timeline items (replay-latest).
    pub fn subscribe_items(&self) -> Subscriber<Vector<TimelineItem>> {
        self.items.subscribe()
    }

    /// Returns the raw timeline items, before postprocessing.
    pub fn raw_items(&self) -> Vector<TimelineItem> {
        self.raw.snapshot()
    }

    pub fn context(&self) -> TimelineContext {
        self.context.get()
    }

    pub fn status(&self) -> TimelineStatus {
        self.status.get()
    }

    pub fn subscribe_status(&self) -> Subscriber<TimelineStatus> {
        self.status.subscribe()
    }

    /// Applies an ordered batch of diffs to the raw timeline,
    /// then re-runs the pipeline over the result.
    ///
    /// On an integrity fault, the timeline stops updating and the fault is returned.
    pub fn apply_update(&self, ops: Vec<UpdateOp<TimelineItem>>) -> Result<(), IntegrityError> {
        if LOG_TIMELINE_DIFFS {
            for op in &ops {
                debug!("timeline: diff {} (batch of {})", op.kind(), ops.len());
            }
        }
        match self.raw.apply(ops) {
            Ok(()) => {
                self.reprocess();
                Ok(())
            }
            Err(e) => {
                error!("timeline: stopping after integrity fault: {e}");
                self.stop(e.clone().into());
                Err(e)
            }
        }
    }

    /// Replaces the room's context flags and re-runs the pipeline if they changed.
    pub fn set_context(&self, context: TimelineContext) {
        if self.context.set_if_not_eq(context).is_some() {
            self.reprocess();
        }
    }

    /// Modifies the room's context flags in place and re-runs the pipeline if they changed.
    pub fn update_context(&self, f: impl FnOnce(&mut TimelineContext)) {
        let changed = {
            let mut guard = self.context.write();
            let mut context = (*guard).clone();
            f(&mut context);
            ObservableWriteGuard::set_if_not_eq(&mut guard, context).is_some()
        };
        if changed {
            self.reprocess();
        }
    }

    fn reprocess(&self) {
        let mut pipeline = self.pipeline.lock().unwrap_or_else(PoisonError::into_inner);
        let raw = self.raw.snapshot();
        let output = pipeline.process(&raw, &self.context.get());
        if LOG_TIMELINE_DIFFS {
            debug!("timeline: {} raw items became {} displayable items", raw.len(), output.len());
        }
        self.items.set_if_not_eq(output);
    }

    fn stop(&self, reason: StopReason) {
        let mut status = self.status.write();
        if let TimelineStatus::Live = *status {
            warn!("timeline: stopped updating: {reason}");
            ObservableWriteGuard::set(&mut status, TimelineStatus::Stopped(reason));
        }
    }

    /// Spawns a task that applies every item of `updates`, in order, until the stream ends,
    /// an integrity fault occurs, or the returned subscription is shut down.
    ///
    /// This must be called from within a Tokio runtime.
    pub fn spawn(
        self: &Arc<Self>,
        updates: impl Stream<Item = TimelineInput> + Send + 'static,
    ) -> Subscription {
        let processor = Arc::clone(self);
        Subscription::spawn(|shutdown_receiver| async move {
            let reason = processor.drive(updates, shutdown_receiver).await;
            processor.stop(reason);
        })
    }

    async fn drive(
        &self,
        updates: impl Stream<Item = TimelineInput>,
        mut shutdown_receiver: oneshot::Receiver<()>,
    ) -> StopReason {
        pin_mut!(updates);
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown_receiver => return StopReason::ShutDown,
                input = updates.next() => match input {
                    Some(TimelineInput::Diffs(ops)) => {
                        if let Err(e) = self.apply_update(ops) {
                            return e.into();
                        }
                    }
                    Some(TimelineInput::Context(context)) => self.set_context(context),
                    None => return StopReason::StreamEnded,
                },
            }
        }
    }
}
