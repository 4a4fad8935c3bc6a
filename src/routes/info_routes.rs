use axum::{
    extract::State,
    routing::get,
    Router,
    http::StatusCode,
    response::{IntoResponse, Response, Html},
    Json,
};

use tokio::fs;
use tracing::{debug, error};
use serde::Serialize;

use crate::state::app_state::AppState;

pub fn health_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/health", get(health_check))
        .route("/info", get(info_check))
        .with_state(state)
}

async fn index_page() -> Response {
    fs::read_to_string("data/index.html")
        .await
        .map(Html)
        .map(IntoResponse::into_response)
        .unwrap_or_else(|e| {
            error!("Index.html read error: {}", e);
            StatusCode::NOT_FOUND.into_response()
        })
}

pub async fn info_check() -> Response {
    let config = crate::utils::conf_helper::get_cached_config();

    debug!("{} requested", config.name);
    Json(config).into_response()
}

/// The server is healthy as long as it answers; `waiting` only means no
/// report has been applied yet.
async fn health_check(State(state): State<AppState>) -> Response {
    let status = if state.latest().is_some() { "ok" } else { "waiting" };

    Json(HealthStatus {
        status: status.to_owned(),
    })
    .into_response()
}

#[derive(Serialize)]
pub struct HealthStatus {
    status: String,
}
