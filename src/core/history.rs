// Rolling per-lane vehicle-count history for the trend chart

use crate::core::constants::{HISTORY_CAPACITY, TIME_LABEL_FORMAT};
use crate::core::format::LaneId;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Local>,
    pub vehicle_count: u32,
}

/// Four lane sequences sharing one time axis. Eviction always drops the
/// oldest point of every lane together, so the sequences stay aligned.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    capacity: usize,
    axis: VecDeque<DateTime<Local>>,
    lanes: [VecDeque<HistoryPoint>; 4],
}

impl HistoryBuffer {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            axis: VecDeque::with_capacity(capacity + 1),
            lanes: std::array::from_fn(|_| VecDeque::with_capacity(capacity + 1)),
        }
    }

    pub fn append(&mut self, lane: LaneId, vehicle_count: u32, timestamp: DateTime<Local>) {
        let seq = &mut self.lanes[lane.index()];
        seq.push_back(HistoryPoint {
            timestamp,
            vehicle_count,
        });

        // first lane of a new poll extends the shared axis
        if seq.len() > self.axis.len() {
            self.axis.push_back(timestamp);
        }

        if seq.len() > self.capacity {
            self.axis.pop_front();
            for seq in self.lanes.iter_mut() {
                seq.pop_front();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.axis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axis.is_empty()
    }

    pub fn lane_len(&self, lane: LaneId) -> usize {
        self.lanes[lane.index()].len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            labels: self
                .axis
                .iter()
                .map(|ts| ts.format(TIME_LABEL_FORMAT).to_string())
                .collect(),
            lanes: LaneId::ALL
                .iter()
                .map(|&lane| LaneSeries {
                    lane,
                    points: self.lanes[lane.index()].iter().copied().collect(),
                })
                .collect(),
        }
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Owned copy of the buffer handed to the chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySnapshot {
    pub labels: Vec<String>,
    pub lanes: Vec<LaneSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaneSeries {
    pub lane: LaneId,
    pub points: Vec<HistoryPoint>,
}

impl HistorySnapshot {
    pub fn series(&self, lane: LaneId) -> Option<&LaneSeries> {
        self.lanes.iter().find(|s| s.lane == lane)
    }

    pub fn counts(&self, lane: LaneId) -> Vec<u32> {
        self.series(lane)
            .map(|s| s.points.iter().map(|p| p.vehicle_count).collect())
            .unwrap_or_default()
    }
}
