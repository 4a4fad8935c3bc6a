// Single-lane status indicator (fails closed to RED)

use crate::core::error::Result;
use crate::core::format::{LaneId, Signal, TrafficReport};
use crate::core::sequence::SequenceGate;
use tracing::{debug, warn};

pub const INDICATOR_LANE: LaneId = LaneId::A;

/// Signal the indicator should show for one status check. Any failure, or a
/// report without the indicator lane, yields RED.
pub fn indicator_signal(result: &Result<TrafficReport>) -> Signal {
    match result {
        Ok(report) => report
            .lane(INDICATOR_LANE)
            .map(|snapshot| snapshot.signal.clone())
            .unwrap_or(Signal::Red),
        Err(e) => {
            warn!("Status check failed ({}), indicator forced to RED: {}", e.kind(), e);
            Signal::Red
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusIndicator {
    gate: SequenceGate,
    signal: Signal,
}

impl StatusIndicator {
    pub fn new() -> Self {
        Self {
            gate: SequenceGate::new(),
            signal: Signal::Red,
        }
    }

    pub fn begin(&mut self) -> u64 {
        self.gate.issue()
    }

    /// Returns the new signal, or `None` when a newer check already landed.
    pub fn observe(&mut self, seq: u64, result: &Result<TrafficReport>) -> Option<&Signal> {
        if !self.gate.is_fresh(seq) {
            debug!("Dropping stale status check #{}", seq);
            return None;
        }
        self.gate.mark_applied(seq);
        self.signal = indicator_signal(result);
        Some(&self.signal)
    }

    pub fn signal(&self) -> &Signal {
        &self.signal
    }
}

impl Default for StatusIndicator {
    fn default() -> Self {
        Self::new()
    }
}
