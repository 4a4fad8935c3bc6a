// Wire format of the traffic-analysis backend

use crate::core::error::Result;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LaneId {
    A,
    B,
    C,
    D,
}

impl LaneId {
    /// Fixed listing order used for ranking and charting.
    pub const ALL: [LaneId; 4] = [LaneId::A, LaneId::B, LaneId::C, LaneId::D];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LaneId::A => "A",
            LaneId::B => "B",
            LaneId::C => "C",
            LaneId::D => "D",
        }
    }
}

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signal color as reported. Unknown text is kept so it can still be shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Signal {
    Red,
    Yellow,
    Green,
    Unrecognized(String),
}

impl Signal {
    pub fn as_str(&self) -> &str {
        match self {
            Signal::Red => "RED",
            Signal::Yellow => "YELLOW",
            Signal::Green => "GREEN",
            Signal::Unrecognized(raw) => raw,
        }
    }
}

impl From<String> for Signal {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "RED" => Signal::Red,
            "YELLOW" => Signal::Yellow,
            "GREEN" => Signal::Green,
            _ => Signal::Unrecognized(raw),
        }
    }
}

impl From<Signal> for String {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneSnapshot {
    pub vehicle_count: u32,
    pub time_left: u32,
    pub signal: Signal,
}

impl LaneSnapshot {
    pub fn new(vehicle_count: u32, time_left: u32, signal: Signal) -> Self {
        Self {
            vehicle_count,
            time_left,
            signal,
        }
    }
}

/// Detected object counts in the order the backend listed them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectCounts(Vec<(String, u32)>);

impl ObjectCounts {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, label: impl Into<String>, count: u32) {
        self.0.push((label.into(), count));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(label, count)| (label.as_str(), *count))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, u32)> for ObjectCounts {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for ObjectCounts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(ObjectCountsVisitor)
    }
}

struct ObjectCountsVisitor;

impl<'de> Visitor<'de> for ObjectCountsVisitor {
    type Value = ObjectCounts;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of object label to non-negative count")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
        let mut counts = ObjectCounts(Vec::with_capacity(map.size_hint().unwrap_or(0)));
        while let Some((label, count)) = map.next_entry::<String, u32>()? {
            counts.push(label, count);
        }
        Ok(counts)
    }
}

/// One poll's payload. Lanes stay optional here; the reconciler rejects
/// reports that lack any of them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TrafficReport {
    #[serde(rename = "lane_A")]
    pub lane_a: Option<LaneSnapshot>,
    #[serde(rename = "lane_B")]
    pub lane_b: Option<LaneSnapshot>,
    #[serde(rename = "lane_C")]
    pub lane_c: Option<LaneSnapshot>,
    #[serde(rename = "lane_D")]
    pub lane_d: Option<LaneSnapshot>,
    pub emergency_detected: Option<bool>,
    pub emergency_lane: Option<LaneId>,
    pub object_counts: Option<ObjectCounts>,
    pub accuracy_rate: Option<f64>,
}

impl TrafficReport {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn lane(&self, lane: LaneId) -> Option<&LaneSnapshot> {
        match lane {
            LaneId::A => self.lane_a.as_ref(),
            LaneId::B => self.lane_b.as_ref(),
            LaneId::C => self.lane_c.as_ref(),
            LaneId::D => self.lane_d.as_ref(),
        }
    }

    pub fn set_lane(&mut self, lane: LaneId, snapshot: LaneSnapshot) {
        let slot = match lane {
            LaneId::A => &mut self.lane_a,
            LaneId::B => &mut self.lane_b,
            LaneId::C => &mut self.lane_c,
            LaneId::D => &mut self.lane_d,
        };
        *slot = Some(snapshot);
    }

    pub fn is_emergency(&self) -> bool {
        self.emergency_detected.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::DashboardError;

    const DETECTION_BODY: &str = r#"{
        "lane_A": {"vehicle_count": 3, "signal": "GREEN", "time_left": 30},
        "lane_B": {"vehicle_count": 1, "signal": "YELLOW", "time_left": 45},
        "lane_C": {"vehicle_count": 0, "signal": "RED", "time_left": 20},
        "lane_D": {"vehicle_count": 0, "signal": "RED", "time_left": 25},
        "accuracy_rate": 0.71,
        "emergency_detected": false,
        "emergency_lane": null,
        "object_counts": {"truck": 1, "car": 3}
    }"#;

    #[test]
    fn test_decode_detection_response() {
        let report = TrafficReport::from_json(DETECTION_BODY.as_bytes()).unwrap();

        assert_eq!(report.lane(LaneId::A), Some(&LaneSnapshot::new(3, 30, Signal::Green)));
        assert_eq!(report.lane(LaneId::B).unwrap().signal, Signal::Yellow);
        assert!(!report.is_emergency());
        assert_eq!(report.emergency_lane, None);
        assert_eq!(report.accuracy_rate, Some(0.71));

        let labels: Vec<_> = report.object_counts.unwrap().iter().map(|(l, _)| l.to_string()).collect();
        assert_eq!(labels, vec!["truck", "car"]);
    }

    #[test]
    fn test_decode_keeps_missing_lane_for_validation() {
        let body = r#"{"lane_A": {"vehicle_count": 1, "signal": "RED", "time_left": 5}}"#;
        let report = TrafficReport::from_json(body.as_bytes()).unwrap();
        assert!(report.lane(LaneId::A).is_some());
        assert!(report.lane(LaneId::D).is_none());
        assert!(report.object_counts.is_none());
    }

    #[test]
    fn test_decode_rejects_negative_count() {
        let body = r#"{"lane_A": {"vehicle_count": -1, "signal": "RED", "time_left": 5}}"#;
        let err = TrafficReport::from_json(body.as_bytes()).unwrap_err();
        assert!(matches!(err, DashboardError::Decode(_)));
    }

    #[test]
    fn test_decode_rejects_non_json() {
        let err = TrafficReport::from_json(b"<html>502</html>").unwrap_err();
        assert_eq!(err.kind(), "decode");
    }

    #[test]
    fn test_unknown_signal_text_is_kept() {
        let signal = Signal::from("FLASHING".to_string());
        assert_eq!(signal, Signal::Unrecognized("FLASHING".to_string()));
        assert_eq!(signal.as_str(), "FLASHING");
        assert_eq!(String::from(Signal::Red), "RED");
    }
}
