// Intersection dashboard core
// History, reconciliation and polling policy for the four-lane dashboard

pub mod core;

// Re-export main types
pub use core::error::{DashboardError, Result};
pub use core::format::{LaneId, LaneSnapshot, ObjectCounts, Signal, TrafficReport};
pub use core::history::{HistoryBuffer, HistoryPoint, HistorySnapshot};
pub use core::poller::{
    DashboardSession, PollOutcome, PollRequest, PollSchedule, PollScheduler, Poller, Presenter,
    ReportSource,
};
pub use core::reconciler::{reconcile, DashboardState, Headline, ObjectSummary, StyleTag};
pub use core::sample::{SampleGenerator, SampleSource};

#[cfg(test)]
mod tests {
    #[test]
    fn test_constants() {
        use crate::core::constants::*;
        assert_eq!(HISTORY_CAPACITY, 20);
        assert_eq!(SAMPLE_POLL_INTERVAL.as_secs(), 2);
        assert_eq!(STATUS_POLL_INTERVAL.as_secs(), 5);
    }
}
