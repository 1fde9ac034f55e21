//! The timeline postprocessing pipeline.
//!
//! The raw timeline is passed through a fixed, ordered list of stages,
//! each of which is a pure function from one immutable list to a new one.
//! Stages only ever inject or remove virtual items (and hidden events);
//! they never modify the events themselves.
//!
//! The order of [`STAGES`] matters:
//! * hidden state events must be gone before anything anchors on the first or last visible item,
//! * trimming the beginning of a DM changes which item is the oldest,
//!   which in turn affects which items fall before the last login.

use std::sync::Arc;

use imbl::Vector;
use ruma::MilliSecondsSinceUnixEpoch;

use super::{context::TimelineContext, item::TimelineItem};

pub mod day_dividers;
pub mod encrypted_history;
pub mod hidden_state_events;
pub mod last_forward_indicator;
pub mod loading_indicators;
pub mod room_beginning;


/// The inputs available to every postprocessing stage.
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    pub timeline: &'a TimelineContext,
    /// The time at which this pipeline run started.
    pub now: MilliSecondsSinceUnixEpoch,
}

/// A single postprocessing stage.
pub type Stage = fn(Vector<TimelineItem>, &StageContext<'_>) -> Vector<TimelineItem>;

/// All postprocessing stages, in the order in which they run.
pub const STAGES: [(&str, Stage); 6] = [
    ("hidden_state_events", hidden_state_events::filter_hidden_state_events),
    ("room_beginning", room_beginning::trim_room_beginning),
    ("encrypted_history", encrypted_history::insert_encrypted_history_banner),
    ("loading_indicators", loading_indicators::insert_loading_indicators),
    ("last_forward_indicator", last_forward_indicator::insert_last_forward_indicator),
    ("day_dividers", day_dividers::insert_day_dividers_and_read_marker),
];

/// Runs all [`STAGES`] over the given raw items, in order.
pub fn run_stages(raw: Vector<TimelineItem>, cx: &StageContext<'_>) -> Vector<TimelineItem> {
    STAGES.iter().fold(raw, |items, (_name, stage)| stage(items, cx))
}


/// A source of the current time, used to timestamp loading indicators.
pub trait Clock: Send + Sync {
    fn now(&self) -> MilliSecondsSinceUnixEpoch;
}

/// The real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;
impl Clock for SystemClock {
    fn now(&self) -> MilliSecondsSinceUnixEpoch {
        MilliSecondsSinceUnixEpoch::now()
    }
}

/// A clock that is stuck at a single point in time.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub MilliSecondsSinceUnixEpoch);
impl Clock for FixedClock {
    fn now(&self) -> MilliSecondsSinceUnixEpoch {
        self.0
    }
}


/// The last run of the pipeline.
struct Memo {
    raw: Vector<TimelineItem>,
    context: TimelineContext,
    output: Vector<TimelineItem>,
}

/// Runs the postprocessing stages, remembering the last run.
///
/// Processing an unchanged raw list with an unchanged context returns the
/// previous output as-is, including the timestamps of its loading indicators.
pub struct TimelinePipeline {
    clock: Arc<dyn Clock>,
    memo: Option<Memo>,
}

impl Default for TimelinePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl TimelinePipeline {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { clock, memo: None }
    }

    /// Returns the displayable list for the given raw list and context.
    pub fn process(&mut self, raw: &Vector<TimelineItem>, context: &TimelineContext) -> Vector<TimelineItem> {
        if let Some(memo) = &self.memo
            && memo.context == *context
            && (memo.raw.ptr_eq(raw) || memo.raw == *raw)
        {
            return memo.output.clone();
        }
        let cx = StageContext { timeline: context, now: self.clock.now() };
        let output = run_stages(raw.clone(), &cx);
        self.memo = Some(Memo {
            raw: raw.clone(),
            context: context.clone(),
            output: output.clone(),
        });
        output
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use imbl::vector;
    use ruma::user_id;
    use crate::{
        test_utils::{ids, membership_event, message, state_event},
        timeline::{
            context::TimelineMode,
            item::{MembershipChange, StateEventKind},
        },
        utils::millis,
    };

    const DAY: u64 = 86_400_000;

    fn pipeline(now: u64) -> TimelinePipeline {
        TimelinePipeline::with_clock(Arc::new(FixedClock(millis(now))))
    }

    fn dm_context() -> TimelineContext {
        TimelineContext {
            is_direct: true,
            room_creator: Some(user_id!("@alice:example.org").to_owned()),
            is_timeline_initialized: true,
            is_at_start_of_timeline: true,
            has_more_forward: true,
            day_dividers: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_full_pipeline_on_a_dm() {
        let raw = vector![
            state_event("create", "@alice:example.org", DAY, StateEventKind::RoomCreate),
            state_event("rules", "@alice:example.org", DAY, StateEventKind::RoomJoinRules),
            membership_event("join", "@alice:example.org", DAY, MembershipChange::Joined),
            message("hi", DAY + 5),
        ];
        let output = pipeline(DAY * 2).process(&raw, &dm_context());
        assert_eq!(ids(&output), ["hi", "ForwardLoadingIndicator"]);
    }

    #[test]
    fn test_empty_room_at_its_start() {
        let context = TimelineContext {
            is_timeline_initialized: true,
            is_at_start_of_timeline: true,
            has_more_forward: true,
            day_dividers: false,
            ..Default::default()
        };
        let output = pipeline(DAY).process(&Vector::new(), &context);
        assert_eq!(ids(&output), ["room_beginning"]);
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let raw = vector![message("a", DAY), message("b", DAY * 3)];
        let context = TimelineContext {
            mode: TimelineMode::FocusedOnEvent,
            is_timeline_initialized: true,
            has_more_backward: true,
            has_more_forward: true,
            ..Default::default()
        };
        let mut pipeline = pipeline(DAY * 4);
        let first = pipeline.process(&raw, &context);
        let second = pipeline.process(&raw, &context);
        assert_eq!(first, second);
        assert_eq!(
            ids(&first),
            [
                "BackwardLoadingIndicator",
                "day_divider_1",
                "a",
                "day_divider_3",
                "b",
                "ForwardLoadingIndicator",
                "last_forward_indicator_ForwardLoadingIndicator",
            ],
        );

        // Even a fresh pipeline run at another time yields the same ids.
        let third = self::pipeline(DAY * 9).process(&raw, &context);
        assert_eq!(ids(&first), ids(&third));
    }

    #[test]
    fn test_context_change_reruns_stages() {
        let raw = vector![message("a", DAY)];
        let mut context = TimelineContext { day_dividers: false, ..Default::default() };
        let mut pipeline = pipeline(DAY);
        assert_eq!(ids(&pipeline.process(&raw, &context)), ["a"]);

        context.is_timeline_initialized = true;
        context.has_more_backward = true;
        assert_eq!(ids(&pipeline.process(&raw, &context)), ["BackwardLoadingIndicator", "a"]);
    }

    #[test]
    fn test_stage_order() {
        let names: Vec<_> = STAGES.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, [
            "hidden_state_events",
            "room_beginning",
            "encrypted_history",
            "loading_indicators",
            "last_forward_indicator",
            "day_dividers",
        ]);
    }
}
