// Poll scheduling, error suppression and session ownership

use crate::core::constants::{SAMPLE_POLL_INTERVAL, STATUS_POLL_INTERVAL};
use crate::core::error::{DashboardError, Result};
use crate::core::format::{Signal, TrafficReport};
use crate::core::history::HistoryBuffer;
use crate::core::reconciler::{reconcile, DashboardState};
use crate::core::sequence::SequenceGate;
use crate::core::status::StatusIndicator;
use chrono::{DateTime, Local};
use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle, JoinSet};
use tokio::time::{interval, interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What to ask the backend for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollRequest {
    /// Empty request; the backend answers with sample data.
    Sample,
    /// Uploaded camera frame for detection.
    Detection { file_name: String, image: Vec<u8> },
}

/// Anything that can answer a poll. The returned future must own what it
/// needs so it can be in flight while the scheduler keeps ticking.
pub trait ReportSource: Send + 'static {
    fn fetch(
        &self,
        request: PollRequest,
    ) -> impl Future<Output = Result<TrafficReport>> + Send + 'static;
}

/// Renders reconciled state. Only ever handed completed reconciliations.
pub trait Presenter: Send + 'static {
    fn present(&mut self, session: &DashboardSession, state: &DashboardState);

    fn present_indicator(&mut self, _signal: &Signal) {}
}

/// Per-session state: rolling history plus the last applied dashboard.
#[derive(Debug, Clone)]
pub struct DashboardSession {
    id: Uuid,
    started_at: DateTime<Local>,
    history: HistoryBuffer,
    current: Option<DashboardState>,
}

impl DashboardSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Local::now(),
            history: HistoryBuffer::new(),
            current: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn current(&self) -> Option<&DashboardState> {
        self.current.as_ref()
    }
}

impl Default for DashboardSession {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Idle,
    Requesting,
}

#[derive(Debug)]
pub enum PollOutcome {
    Applied,
    Suppressed(DashboardError),
    Stale { seq: u64, last_applied: u64 },
}

#[derive(Debug, Default)]
pub struct Poller {
    session: DashboardSession,
    gate: SequenceGate,
    in_flight: usize,
}

impl Poller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> &DashboardSession {
        &self.session
    }

    pub fn phase(&self) -> PollPhase {
        if self.in_flight > 0 {
            PollPhase::Requesting
        } else {
            PollPhase::Idle
        }
    }

    /// Issues the sequence number for a new request.
    pub fn begin(&mut self) -> u64 {
        self.in_flight += 1;
        let seq = self.gate.issue();
        debug!("Poll #{} requesting ({} in flight)", seq, self.in_flight);
        seq
    }

    /// Applies or suppresses a finished request. Errors and stale results
    /// leave the session exactly as it was.
    pub fn complete(
        &mut self,
        seq: u64,
        result: Result<TrafficReport>,
        now: DateTime<Local>,
    ) -> PollOutcome {
        self.in_flight = self.in_flight.saturating_sub(1);

        let report = match result {
            Ok(report) => report,
            Err(e) => return self.suppress(seq, e),
        };

        if !self.gate.is_fresh(seq) {
            let last_applied = self.gate.last_applied().unwrap_or_default();
            warn!("Discarding stale poll #{} (last applied #{})", seq, last_applied);
            return PollOutcome::Stale { seq, last_applied };
        }

        match reconcile(&report, &mut self.session.history, now) {
            Ok(mut state) => {
                state.seq = seq;
                self.gate.mark_applied(seq);
                self.session.current = Some(state);
                debug!("Poll #{} applied", seq);
                PollOutcome::Applied
            }
            Err(e) => self.suppress(seq, e),
        }
    }

    fn suppress(&self, seq: u64, error: DashboardError) -> PollOutcome {
        warn!("Poll #{} suppressed ({}): {}", seq, error.kind(), error);
        PollOutcome::Suppressed(error)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PollSchedule {
    pub sample_interval: Duration,
    /// `None` disables the single-lane indicator checks.
    pub status_interval: Option<Duration>,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            sample_interval: SAMPLE_POLL_INTERVAL,
            status_interval: Some(STATUS_POLL_INTERVAL),
        }
    }
}

enum Completion {
    Dashboard(u64, Result<TrafficReport>),
    Indicator(u64, Result<TrafficReport>),
}

struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Runs a fetch on its own task so a panicking source surfaces as a
/// transport error for that sequence number instead of a lost completion.
async fn isolate<F>(fetch: F) -> Result<TrafficReport>
where
    F: Future<Output = Result<TrafficReport>> + Send + 'static,
{
    let task = tokio::spawn(fetch);
    let _abort = AbortOnDrop(task.abort_handle());
    match task.await {
        Ok(result) => result,
        Err(e) => Err(DashboardError::Transport(format!("poll task failed: {}", e))),
    }
}

/// Owns the polling timers for one dashboard session. Dropping or stopping
/// it ends the loop; in-flight requests are abandoned.
pub struct PollScheduler {
    triggers: mpsc::Sender<PollRequest>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<Poller>,
}

impl PollScheduler {
    pub fn start<S, P>(source: S, presenter: P, schedule: PollSchedule) -> Self
    where
        S: ReportSource,
        P: Presenter,
    {
        let (triggers, trigger_rx) = mpsc::channel(16);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run_loop(
            Poller::new(),
            source,
            presenter,
            schedule,
            trigger_rx,
            shutdown_rx,
        ));

        Self {
            triggers,
            shutdown,
            task,
        }
    }

    /// Manual trigger (sample button, upload). Returns false once stopped.
    pub async fn trigger(&self, request: PollRequest) -> bool {
        self.triggers.send(request).await.is_ok()
    }

    pub fn triggers(&self) -> mpsc::Sender<PollRequest> {
        self.triggers.clone()
    }

    /// Stops the timers and hands back the poller with its session.
    pub async fn stop(self) -> Option<Poller> {
        let _ = self.shutdown.send(true);
        match self.task.await {
            Ok(poller) => Some(poller),
            Err(e) => {
                warn!("Poll loop ended abnormally: {}", e);
                None
            }
        }
    }
}

async fn run_loop<S, P>(
    mut poller: Poller,
    source: S,
    mut presenter: P,
    schedule: PollSchedule,
    mut triggers: mpsc::Receiver<PollRequest>,
    mut shutdown: watch::Receiver<bool>,
) -> Poller
where
    S: ReportSource,
    P: Presenter,
{
    let mut sample_ticks = interval_at(
        Instant::now() + schedule.sample_interval,
        schedule.sample_interval,
    );
    sample_ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut status_ticks = schedule.status_interval.map(|period| {
        let mut ticks = interval(period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticks
    });

    let mut indicator = StatusIndicator::new();
    let mut in_flight: JoinSet<Completion> = JoinSet::new();

    info!(
        "Poll loop started for session {} (every {:?})",
        poller.session().id(),
        schedule.sample_interval
    );

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,

            _ = sample_ticks.tick() => {
                let seq = poller.begin();
                let fetch = source.fetch(PollRequest::Sample);
                in_flight.spawn(async move { Completion::Dashboard(seq, isolate(fetch).await) });
            }

            _ = next_tick(&mut status_ticks) => {
                let seq = indicator.begin();
                let fetch = source.fetch(PollRequest::Sample);
                in_flight.spawn(async move { Completion::Indicator(seq, isolate(fetch).await) });
            }

            Some(request) = triggers.recv() => {
                let seq = poller.begin();
                info!("Manual poll #{} triggered", seq);
                let fetch = source.fetch(request);
                in_flight.spawn(async move { Completion::Dashboard(seq, isolate(fetch).await) });
            }

            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => match joined {
                Ok(Completion::Dashboard(seq, result)) => {
                    if let PollOutcome::Applied = poller.complete(seq, result, Local::now()) {
                        if let Some(state) = poller.session().current() {
                            presenter.present(poller.session(), state);
                        }
                    }
                }
                Ok(Completion::Indicator(seq, result)) => {
                    if let Some(signal) = indicator.observe(seq, &result) {
                        presenter.present_indicator(signal);
                    }
                }
                Err(e) => warn!("Poll task failed: {}", e),
            },
        }
    }

    in_flight.abort_all();
    info!("Poll loop stopped for session {}", poller.session().id());
    poller
}

async fn next_tick(ticks: &mut Option<Interval>) {
    match ticks {
        Some(ticks) => {
            ticks.tick().await;
        }
        None => std::future::pending().await,
    }
}
