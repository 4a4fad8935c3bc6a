use axum::Router;
use tokio::sync::oneshot;
use tracing::{info, Level};
use tracing_subscriber;

mod routes;
mod models;
mod utils;
mod client;
mod state;

use crate::client::traffic_client::HttpReportSource;
use crate::state::app_state::{AppState, WatchPresenter};
use crate::utils::conf_helper::{init_config_and_bind, get_cached_config};
use traffic_core::{PollScheduler, SampleGenerator, SampleSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    // === CONFIG + LISTENER ===
    let listener = init_config_and_bind()
        .await
        .map_err(anyhow::Error::msg)?;

    let config = get_cached_config();

    info!(
        "{} v{} initialized on {}:{}",
        config.name,
        config.version,
        config.connection.ip,
        config.connection.port
    );

    // === POLL LOOP ===
    let (presenter, views) = WatchPresenter::new();
    let schedule = config.backend.schedule();

    let scheduler = if config.backend.offline {
        info!("Offline mode: serving generated sample data");
        PollScheduler::start(
            SampleSource::new(SampleGenerator::from_entropy()),
            presenter,
            schedule,
        )
    } else {
        let source = HttpReportSource::new(&config.backend.url, config.backend.request_timeout())
            .map_err(anyhow::Error::msg)?;
        PollScheduler::start(source, presenter, schedule)
    };

    let state = AppState::new(views, scheduler.triggers());

    let app = Router::new()
        .merge(routes::info_routes::health_routes(state.clone()))
        .merge(routes::data_routes::data_routes(state));

    // stopping the poll loop drops the presenter, which closes live streams
    let (stopped_tx, stopped_rx) = oneshot::channel();

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
            let _ = stopped_tx.send(scheduler.stop().await);
        })
        .await?;

    if let Ok(Some(poller)) = stopped_rx.await {
        info!(
            "Session {} closed with {} history points",
            poller.session().id(),
            poller.session().history().len()
        );
    }

    Ok(())
}
