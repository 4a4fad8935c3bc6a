// Replays generated sample reports through the reconciler, offline

use chrono::{Duration, Local};
use tracing::{debug, info, Level};
use tracing_subscriber;

use traffic_core::{reconcile, HistoryBuffer, LaneId, ObjectSummary, SampleGenerator};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .init();

    let mut generator = SampleGenerator::seeded(2024);
    let mut history = HistoryBuffer::new();
    let start = Local::now();

    // more polls than the chart keeps, to show eviction
    for poll in 0..25i64 {
        let mut report = generator.next_report();
        if poll == 12 {
            report.emergency_detected = Some(true);
            report.emergency_lane = Some(LaneId::C);
        }

        let state = reconcile(&report, &mut history, start + Duration::seconds(poll * 2))?;
        info!("#{:02} {}", poll, state.message);

        for lane in &state.lanes {
            debug!(
                "  Lane {}: {} vehicles, {}s, {} ({:?})",
                lane.lane, lane.vehicle_count, lane.time_left, lane.signal, lane.style
            );
        }
        if let ObjectSummary::Detected(objects) = &state.objects {
            let line: Vec<String> = objects
                .iter()
                .map(|o| format!("{}: {}", o.label, o.count))
                .collect();
            debug!("  Objects: {}", line.join(", "));
        }
    }

    let snapshot = history.snapshot();
    info!(
        "Chart holds {} points from {} to {}",
        snapshot.labels.len(),
        snapshot.labels.first().map(String::as_str).unwrap_or("-"),
        snapshot.labels.last().map(String::as_str).unwrap_or("-")
    );
    for lane in LaneId::ALL {
        info!("Lane {} trend: {:?}", lane, snapshot.counts(lane));
    }

    Ok(())
}
