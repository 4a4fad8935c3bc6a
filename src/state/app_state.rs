use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::info;

use traffic_core::{DashboardSession, DashboardState, PollRequest, Presenter, Signal};

pub type SharedState = Option<Arc<DashboardState>>;

/// Read side handed to the HTTP routes.
#[derive(Clone)]
pub struct AppState {
    pub dashboard: watch::Receiver<SharedState>,
    pub indicator: watch::Receiver<Signal>,
    pub triggers: mpsc::Sender<PollRequest>,
}

impl AppState {
    pub fn new(views: DashboardViews, triggers: mpsc::Sender<PollRequest>) -> Self {
        Self {
            dashboard: views.dashboard,
            indicator: views.indicator,
            triggers,
        }
    }

    pub fn latest(&self) -> SharedState {
        self.dashboard.borrow().clone()
    }
}

pub struct DashboardViews {
    pub dashboard: watch::Receiver<SharedState>,
    pub indicator: watch::Receiver<Signal>,
}

/// Publishes every applied state to the web surface.
pub struct WatchPresenter {
    dashboard: watch::Sender<SharedState>,
    indicator: watch::Sender<Signal>,
}

impl WatchPresenter {
    pub fn new() -> (Self, DashboardViews) {
        let (dashboard, dashboard_rx) = watch::channel(None);
        // nothing confirmed yet, so the light starts at stop
        let (indicator, indicator_rx) = watch::channel(Signal::Red);
        (
            Self {
                dashboard,
                indicator,
            },
            DashboardViews {
                dashboard: dashboard_rx,
                indicator: indicator_rx,
            },
        )
    }
}

impl Presenter for WatchPresenter {
    fn present(&mut self, session: &DashboardSession, state: &DashboardState) {
        info!(
            "[{}] {} ({} points)",
            session.id(),
            state.message,
            session.history().len()
        );
        self.dashboard.send_replace(Some(Arc::new(state.clone())));
    }

    fn present_indicator(&mut self, signal: &Signal) {
        if *self.indicator.borrow() != *signal {
            info!("Indicator now {}", signal);
        }
        self.indicator.send_replace(signal.clone());
    }
}
