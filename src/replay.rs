//! Replays a recorded room list and timeline update stream from a JSON scenario file,
//! printing the resulting room summaries and displayable timeline as JSON.
//!
//! A scenario looks like this (every field is optional):
//! ```json
//! {
//!   "room_list": {
//!     "inputs": [
//!       { "maximum_number_of_rooms": 2 },
//!       { "diffs": [{ "op": "push_back", "value": { "room_id": "!a:example.org", "membership": "joined" } }] }
//!     ],
//!     "rebuild_entries": [],
//!     "rebuild": false,
//!     "load_more": 1,
//!     "filter": { "normalized_match_room_name": "rust" }
//!   },
//!   "timeline": {
//!     "context": { "is_timeline_initialized": true },
//!     "inputs": [{ "diffs": [{ "op": "clear" }] }]
//!   }
//! }
//! ```

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use anyhow::{Context, bail};
use clap::Parser;
use eyeball::Subscriber;
use futures_util::stream;
use imbl::Vector;
use ruma::{OwnedRoomId, RoomId};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    config::SyncConfig,
    error::RebuildError,
    room::{
        room_display_filter::RoomListFilter,
        room_summary::{RawRoomEntry, RoomSummary},
    },
    room_list::{
        DynamicRoomList, RoomEntrySource, RoomListControl, RoomListInput, RoomListLoadingState,
        RoomListSynchronizer,
    },
    timeline::{
        TimelineContext, TimelineInput, TimelineProcessor, TimelineStatus,
        item::TimelineItem,
        postprocess::{Clock, FixedClock, SystemClock},
    },
    utils,
};


#[derive(Parser, Debug)]
#[clap(name = "robrix-sync-replay", about = "Replays a recorded room list and timeline update stream.")]
pub struct Cli {
    /// The JSON scenario file to replay.
    #[clap(value_parser)]
    pub scenario: PathBuf,

    /// A JSON config file; defaults are used for anything it doesn't set.
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// Use this fixed time (in milliseconds since the Unix Epoch) as "now",
    /// which makes the output reproducible.
    #[clap(long)]
    pub now: Option<u64>,

    /// Pretty-print the JSON output.
    #[clap(short, long, action)]
    pub pretty: bool,

    /// Enable verbose logging output.
    #[clap(short, long, action)]
    pub verbose: bool,
}

/// Installs a `tracing` subscriber that logs to stderr,
/// honoring `RUST_LOG` if it is set.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}


#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Scenario {
    pub room_list: Option<RoomListScenario>,
    pub timeline: Option<TimelineScenario>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoomListScenario {
    pub inputs: Vec<RoomListInput>,
    /// The entries served to a rebuild. Rooms not listed here are "not found".
    pub rebuild_entries: Vec<RawRoomEntry>,
    /// Whether to rebuild all summaries once all inputs were applied.
    pub rebuild: bool,
    /// How many times to request one more page.
    pub load_more: usize,
    /// The filter applied once all inputs were applied.
    pub filter: Option<RoomListFilter>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimelineScenario {
    /// The initial context; the config's timeline settings are used if absent.
    pub context: Option<TimelineContext>,
    pub inputs: Vec<TimelineInput>,
}

#[derive(Debug, Serialize)]
pub struct ReplayOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_list: Option<RoomListOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<TimelineOutput>,
}

#[derive(Debug, Serialize)]
pub struct RoomListOutput {
    pub loaded: bool,
    pub maximum_number_of_rooms: Option<u32>,
    /// Why the room list stopped updating.
    pub stopped: Option<String>,
    pub rebuilt: Option<usize>,
    pub rooms: Vector<RoomSummary>,
    pub filtered_rooms: Vector<RoomSummary>,
    pub page_count: usize,
    /// The control messages that would have been sent upstream, in order.
    pub controls: Vec<RoomListControl>,
}

#[derive(Debug, Serialize)]
pub struct TimelineOutput {
    pub stopped: Option<String>,
    pub raw_len: usize,
    pub items: Vector<TimelineItem>,
}


/// Serves rebuilds from the entries listed in a scenario.
struct ScenarioEntrySource(HashMap<OwnedRoomId, RawRoomEntry>);

impl RoomEntrySource for ScenarioEntrySource {
    async fn fetch_room(&self, room_id: &RoomId) -> Result<RawRoomEntry, RebuildError> {
        self.0.get(room_id)
            .cloned()
            .ok_or_else(|| RebuildError::NotFound(room_id.to_owned()))
    }
}


/// Parses the command line's scenario and config, replays it, and prints the result.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => SyncConfig::load(path)?,
        None => SyncConfig::default(),
    };
    let contents = std::fs::read_to_string(&cli.scenario)
        .with_context(|| format!("failed to read scenario file {}", cli.scenario.display()))?;
    let scenario: Scenario = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse scenario file {}", cli.scenario.display()))?;
    if scenario.room_list.is_none() && scenario.timeline.is_none() {
        bail!("scenario {} contains neither a room list nor a timeline", cli.scenario.display());
    }

    let clock: Arc<dyn Clock> = match cli.now {
        Some(now) => Arc::new(FixedClock(utils::millis(now))),
        None => Arc::new(SystemClock),
    };
    let output = replay(scenario, &config, clock).await?;
    let json = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{json}");
    Ok(())
}

/// Replays the given scenario to completion.
pub async fn replay(scenario: Scenario, config: &SyncConfig, clock: Arc<dyn Clock>) -> anyhow::Result<ReplayOutput> {
    let room_list = match scenario.room_list {
        Some(room_list) => Some(replay_room_list(room_list, config).await?),
        None => None,
    };
    let timeline = match scenario.timeline {
        Some(timeline) => Some(replay_timeline(timeline, config, clock).await),
        None => None,
    };
    Ok(ReplayOutput { room_list, timeline })
}

async fn replay_room_list(scenario: RoomListScenario, config: &SyncConfig) -> anyhow::Result<RoomListOutput> {
    let source = ScenarioEntrySource(
        scenario.rebuild_entries.into_iter().map(|raw| (raw.room_id.clone(), raw)).collect()
    );
    let synchronizer = Arc::new(RoomListSynchronizer::new(source));
    let (dynamic_room_list, mut controls_receiver) = DynamicRoomList::new(&synchronizer, &config.room_list);

    info!("Replaying {} room list inputs", scenario.inputs.len());
    let subscription = synchronizer.spawn(stream::iter(scenario.inputs));
    let final_state = wait_until(
        synchronizer.subscribe_loading_state(),
        |state| matches!(state, RoomListLoadingState::Stopped(_)),
    ).await;
    subscription.shutdown().await;

    let rebuilt = if scenario.rebuild {
        Some(dynamic_room_list.rebuild_summaries(&synchronizer).await
            .context("failed to rebuild room summaries")?)
    } else {
        None
    };
    for _ in 0..scenario.load_more {
        dynamic_room_list.load_more();
    }
    // Applying the filter recomputes the filtered list against the final snapshot.
    dynamic_room_list.update_filter(scenario.filter.unwrap_or_else(|| dynamic_room_list.filter()));

    info!("Room list replay finished with {} rooms", synchronizer.summaries().len());
    let mut controls = Vec::new();
    while let Ok(control) = controls_receiver.try_recv() {
        controls.push(control);
    }

    let stopped = match final_state {
        RoomListLoadingState::Stopped(reason) => Some(reason.to_string()),
        _ => None,
    };
    Ok(RoomListOutput {
        loaded: synchronizer.has_loaded(),
        maximum_number_of_rooms: synchronizer.maximum_number_of_rooms(),
        stopped,
        rebuilt,
        rooms: dynamic_room_list.all_rooms(),
        filtered_rooms: dynamic_room_list.filtered_rooms(),
        page_count: dynamic_room_list.page_count(),
        controls,
    })
}

async fn replay_timeline(scenario: TimelineScenario, config: &SyncConfig, clock: Arc<dyn Clock>) -> TimelineOutput {
    let context = scenario.context.unwrap_or_else(|| TimelineContext::from_config(&config.timeline));
    let processor = Arc::new(TimelineProcessor::with_clock(context, clock));

    info!("Replaying {} timeline inputs", scenario.inputs.len());
    let subscription = processor.spawn(stream::iter(scenario.inputs));
    let final_status = wait_until(
        processor.subscribe_status(),
        |status| matches!(status, TimelineStatus::Stopped(_)),
    ).await;
    subscription.shutdown().await;

    TimelineOutput {
        stopped: match final_status {
            TimelineStatus::Stopped(reason) => Some(reason.to_string()),
            TimelineStatus::Live => None,
        },
        raw_len: processor.raw_items().len(),
        items: processor.items(),
    }
}

/// Waits until the observed value satisfies `done`, or the observable is dropped.
async fn wait_until<T: Clone + Send + Sync + 'static>(
    mut subscriber: Subscriber<T>,
    done: impl Fn(&T) -> bool,
) -> T {
    let mut value = subscriber.next_now();
    while !done(&value) {
        match subscriber.next().await {
            Some(next) => value = next,
            None => break,
        }
    }
    value
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replay_scenario() {
        let scenario: Scenario = serde_json::from_str(r#"{
            "room_list": {
                "inputs": [
                    { "maximum_number_of_rooms": 3 },
                    { "diffs": [
                        { "op": "append", "values": [
                            { "room_id": "!a:example.org", "name": "Rust", "membership": "joined" },
                            { "room_id": "!b:example.org", "name": "Café", "membership": "invited" }
                        ] }
                    ] }
                ],
                "rebuild_entries": [
                    { "room_id": "!a:example.org", "name": "Rustaceans", "membership": "joined" }
                ],
                "rebuild": true,
                "load_more": 2,
                "filter": { "normalized_match_room_name": "cafe" }
            },
            "timeline": {
                "context": { "is_timeline_initialized": true, "has_more_backward": true, "day_dividers": false },
                "inputs": [
                    { "diffs": [{ "op": "push_back", "value": {
                        "unique_id": "a",
                        "kind": { "event": {
                            "sender": "@alice:example.org",
                            "timestamp": 5,
                            "content": { "message": { "msgtype": "text", "body": "hi" } }
                        } }
                    } }] }
                ]
            }
        }"#).unwrap();

        let output = replay(scenario, &SyncConfig::default(), Arc::new(FixedClock(utils::millis(9)))).await.unwrap();

        let room_list = output.room_list.unwrap();
        assert!(room_list.loaded);
        assert_eq!(room_list.rebuilt, Some(1));
        assert_eq!(room_list.stopped.as_deref(), Some("the upstream update stream ended"));
        let names: Vec<_> = room_list.rooms.iter().map(|r| r.display_name.as_str()).collect();
        assert_eq!(names, ["Rustaceans", "Café"]);
        assert_eq!(room_list.filtered_rooms.len(), 1);
        assert_eq!(room_list.page_count, 3);
        assert_eq!(room_list.controls.len(), 3);

        let timeline = output.timeline.unwrap();
        assert_eq!(timeline.raw_len, 1);
        let ids: Vec<_> = timeline.items.iter().map(|item| item.unique_id.as_str()).collect();
        assert_eq!(ids, ["BackwardLoadingIndicator", "a"]);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<Scenario>(r#"{ "rooms": [] }"#).is_err());
    }
}
