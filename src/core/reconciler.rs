// Report -> renderable dashboard state

use crate::core::error::{DashboardError, Result};
use crate::core::format::{LaneId, LaneSnapshot, Signal, TrafficReport};
use crate::core::history::{HistoryBuffer, HistorySnapshot};
use chrono::{DateTime, Local};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleTag {
    Success,
    Warning,
    Danger,
}

pub fn style_tag(signal: &Signal) -> StyleTag {
    match signal {
        Signal::Green => StyleTag::Success,
        Signal::Yellow => StyleTag::Warning,
        _ => StyleTag::Danger,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaneView {
    pub lane: LaneId,
    pub vehicle_count: u32,
    pub time_left: u32,
    pub signal: Signal,
    pub style: StyleTag,
}

impl LaneView {
    fn project(lane: LaneId, snapshot: &LaneSnapshot) -> Self {
        Self {
            lane,
            vehicle_count: snapshot.vehicle_count,
            time_left: snapshot.time_left,
            signal: snapshot.signal.clone(),
            style: style_tag(&snapshot.signal),
        }
    }
}

/// Serialized as `{"kind": ..., "lanes": [...]}`; `lanes` is a list for
/// every kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Headline {
    ClearFirst(LaneId),
    JointHighest(Vec<LaneId>),
    Emergency(LaneId),
}

impl Headline {
    pub fn kind(&self) -> &'static str {
        match self {
            Headline::ClearFirst(_) => "clear_first",
            Headline::JointHighest(_) => "joint_highest",
            Headline::Emergency(_) => "emergency",
        }
    }

    pub fn lanes(&self) -> &[LaneId] {
        match self {
            Headline::ClearFirst(lane) | Headline::Emergency(lane) => std::slice::from_ref(lane),
            Headline::JointHighest(lanes) => lanes,
        }
    }
}

impl Serialize for Headline {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_struct("Headline", 2)?;
        out.serialize_field("kind", self.kind())?;
        out.serialize_field("lanes", self.lanes())?;
        out.end()
    }
}

impl fmt::Display for Headline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Headline::ClearFirst(lane) => write!(
                f,
                "Lane {lane} has the most vehicles. Consider clearing Lane {lane} first."
            ),
            Headline::JointHighest(lanes) => {
                let names: Vec<&str> = lanes.iter().map(|l| l.as_str()).collect();
                write!(f, "Lanes {} have the same (highest) vehicle count.", names.join(", "))
            }
            Headline::Emergency(lane) => write!(
                f,
                "Emergency vehicle detected in Lane {lane}. Please clear this lane!"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectEntry {
    pub label: String,
    pub count: u32,
}

/// `NoObjects` is distinct from a list of zero counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "objects", rename_all = "snake_case")]
pub enum ObjectSummary {
    NoObjects,
    Detected(Vec<ObjectEntry>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardState {
    pub lanes: Vec<LaneView>,
    pub history: HistorySnapshot,
    pub headline: Headline,
    pub message: String,
    pub objects: ObjectSummary,
    pub accuracy_rate: Option<f64>,
    pub generated_at: DateTime<Local>,
    /// Poll that produced this state; 0 until a poller stamps it.
    pub seq: u64,
}

impl DashboardState {
    pub fn lane(&self, lane: LaneId) -> Option<&LaneView> {
        self.lanes.iter().find(|v| v.lane == lane)
    }
}

/// Builds the next dashboard state. The history is only touched once the
/// report has passed validation.
pub fn reconcile(
    report: &TrafficReport,
    history: &mut HistoryBuffer,
    now: DateTime<Local>,
) -> Result<DashboardState> {
    let snapshots = validate_lanes(report)?;
    let emergency = emergency_lane(report)?;

    let lanes: Vec<LaneView> = snapshots
        .iter()
        .map(|(lane, snapshot)| LaneView::project(*lane, snapshot))
        .collect();

    for (lane, snapshot) in &snapshots {
        history.append(*lane, snapshot.vehicle_count, now);
    }

    let counts: Vec<(LaneId, u32)> = snapshots
        .iter()
        .map(|(lane, snapshot)| (*lane, snapshot.vehicle_count))
        .collect();

    let headline = match emergency {
        Some(lane) => Headline::Emergency(lane),
        None => rank_congestion(&counts),
    };
    debug!("Reconciled report: {:?}", headline);

    Ok(DashboardState {
        lanes,
        history: history.snapshot(),
        message: headline.to_string(),
        headline,
        objects: summarize_objects(report),
        accuracy_rate: report.accuracy_rate,
        generated_at: now,
        seq: 0,
    })
}

fn validate_lanes(report: &TrafficReport) -> Result<Vec<(LaneId, &LaneSnapshot)>> {
    let present: Vec<_> = LaneId::ALL
        .iter()
        .filter_map(|&lane| report.lane(lane).map(|snapshot| (lane, snapshot)))
        .collect();

    if present.len() != LaneId::ALL.len() {
        let missing: Vec<String> = LaneId::ALL
            .iter()
            .filter(|lane| report.lane(**lane).is_none())
            .map(|lane| format!("lane_{lane}"))
            .collect();
        return Err(DashboardError::MalformedReport(format!(
            "missing {}",
            missing.join(", ")
        )));
    }

    Ok(present)
}

fn emergency_lane(report: &TrafficReport) -> Result<Option<LaneId>> {
    if !report.is_emergency() {
        return Ok(None);
    }
    report.emergency_lane.map(Some).ok_or_else(|| {
        DashboardError::MalformedReport("emergency_detected without emergency_lane".to_string())
    })
}

/// Lanes sharing the highest count, always listed A, B, C, D.
pub fn rank_congestion(counts: &[(LaneId, u32)]) -> Headline {
    let max = counts.iter().map(|(_, count)| *count).max().unwrap_or(0);

    let mut leaders: Vec<LaneId> = counts
        .iter()
        .filter(|(_, count)| *count == max)
        .map(|(lane, _)| *lane)
        .collect();
    leaders.sort();
    leaders.dedup();

    match leaders.as_slice() {
        [only] => Headline::ClearFirst(*only),
        _ => Headline::JointHighest(leaders),
    }
}

pub fn summarize_objects(report: &TrafficReport) -> ObjectSummary {
    match &report.object_counts {
        Some(counts) if !counts.is_empty() => ObjectSummary::Detected(
            counts
                .iter()
                .map(|(label, count)| ObjectEntry {
                    label: capitalize(label),
                    count,
                })
                .collect(),
        ),
        _ => ObjectSummary::NoObjects,
    }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
