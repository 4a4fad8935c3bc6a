// Offline sample reports, shaped like the backend's sample mode

use crate::core::constants::{SAMPLE_MAX_PER_TYPE, SAMPLE_TIME_LEFT_RANGE, SAMPLE_VEHICLE_TYPES};
use crate::core::error::Result;
use crate::core::format::{LaneId, LaneSnapshot, ObjectCounts, Signal, TrafficReport};
use crate::core::poller::{PollRequest, ReportSource};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::future::Future;
use std::sync::{Arc, Mutex};
use tracing::debug;

pub struct SampleGenerator {
    rng: StdRng,
}

impl SampleGenerator {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_report(&mut self) -> TrafficReport {
        let mut per_type = [[0u32; SAMPLE_VEHICLE_TYPES.len()]; 4];
        let mut lane_totals = [0u32; 4];

        for (lane, counts) in per_type.iter_mut().enumerate() {
            for count in counts.iter_mut() {
                *count = self.rng.gen_range(0..=SAMPLE_MAX_PER_TYPE);
                lane_totals[lane] += *count;
            }
        }

        let signals = assign_signals(&lane_totals);
        let (min_left, max_left) = SAMPLE_TIME_LEFT_RANGE;

        let mut report = TrafficReport::default();
        for (i, lane) in LaneId::ALL.iter().enumerate() {
            let time_left = self.rng.gen_range(min_left..=max_left);
            report.set_lane(
                *lane,
                LaneSnapshot::new(lane_totals[i], time_left, signals[i].clone()),
            );
        }

        report.object_counts = Some(
            SAMPLE_VEHICLE_TYPES
                .iter()
                .enumerate()
                .map(|(t, label)| (label.to_string(), per_type.iter().map(|lane| lane[t]).sum::<u32>()))
                .collect::<ObjectCounts>(),
        );

        debug!("Generated sample report: {:?}", lane_totals);
        report
    }
}

/// GREEN for the busiest lane and YELLOW for the runner-up, each only when
/// it has traffic. Ties keep lane order.
pub fn assign_signals(totals: &[u32; 4]) -> [Signal; 4] {
    let mut ranked: Vec<usize> = (0..totals.len()).collect();
    ranked.sort_by(|a, b| totals[*b].cmp(&totals[*a]));

    let mut signals: [Signal; 4] = std::array::from_fn(|_| Signal::Red);
    if totals[ranked[0]] > 0 {
        signals[ranked[0]] = Signal::Green;
    }
    if totals[ranked[1]] > 0 {
        signals[ranked[1]] = Signal::Yellow;
    }
    signals
}

/// Report source that never touches the network.
#[derive(Clone)]
pub struct SampleSource {
    generator: Arc<Mutex<SampleGenerator>>,
}

impl SampleSource {
    pub fn new(generator: SampleGenerator) -> Self {
        Self {
            generator: Arc::new(Mutex::new(generator)),
        }
    }
}

impl ReportSource for SampleSource {
    fn fetch(
        &self,
        request: PollRequest,
    ) -> impl Future<Output = Result<TrafficReport>> + Send + 'static {
        if let PollRequest::Detection { file_name, .. } = &request {
            debug!("Offline mode: ignoring upload {}, serving sample data", file_name);
        }
        let report = match self.generator.lock() {
            Ok(mut generator) => generator.next_report(),
            Err(poisoned) => poisoned.into_inner().next_report(),
        };
        async move { Ok(report) }
    }
}
