use axum::{
    routing::{get, post},
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
    extract::{
        DefaultBodyLimit,
        Multipart,
        State,
        ws::WebSocketUpgrade,
    },
};

use tracing::{info, debug, warn};
use serde::Serialize;

use crate::routes::live_ws::handle_live;
use crate::state::app_state::AppState;
use traffic_core::core::constants::IMAGE_FIELD;
use traffic_core::core::reconciler::style_tag;
use traffic_core::{PollRequest, Signal, StyleTag};

const UPLOAD_LIMIT: usize = 16 * 1024 * 1024;

#[derive(Serialize)]
pub struct IndicatorView {
    pub signal: Signal,
    pub style: StyleTag,
}

#[derive(Serialize)]
pub struct TriggerAccepted {
    pub request: &'static str,
}


/// =======================
/// ROUTER
/// =======================

pub fn data_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/state", get(current_state))
        .route("/api/indicator", get(indicator))
        .route("/api/sample", post(use_sample))
        .route(
            "/api/upload",
            post(upload_image).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
        .route("/live", get(live))
        .with_state(state)
}


/// =======================
/// HANDLERS
/// =======================

async fn current_state(State(state): State<AppState>) -> Response {
    match state.latest() {
        Some(dashboard) => Json(&*dashboard).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn indicator(State(state): State<AppState>) -> impl IntoResponse {
    let signal = state.indicator.borrow().clone();
    Json(IndicatorView {
        style: style_tag(&signal),
        signal,
    })
}

async fn use_sample(State(state): State<AppState>) -> Response {
    debug!("Sample data requested");
    enqueue(&state, PollRequest::Sample, "sample").await
}

async fn upload_image(State(state): State<AppState>, mut form: Multipart) -> Response {
    loop {
        let field = match form.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("Upload rejected: {}", e);
                return StatusCode::BAD_REQUEST.into_response();
            }
        };

        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let image = match field.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                warn!("Upload read failed: {}", e);
                return StatusCode::BAD_REQUEST.into_response();
            }
        };

        info!("Image uploaded: {} ({} bytes)", file_name, image.len());
        return enqueue(&state, PollRequest::Detection { file_name, image }, "detection").await;
    }

    warn!("Upload without an '{}' field", IMAGE_FIELD);
    StatusCode::BAD_REQUEST.into_response()
}

async fn enqueue(state: &AppState, request: PollRequest, label: &'static str) -> Response {
    match state.triggers.send(request).await {
        Ok(()) => (StatusCode::ACCEPTED, Json(TriggerAccepted { request: label })).into_response(),
        Err(_) => {
            warn!("Poll loop is not running, {} trigger dropped", label);
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

async fn live(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let updates = state.dashboard.clone();
    ws.on_upgrade(move |socket| handle_live(socket, updates))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::app_state::WatchPresenter;
    use chrono::Local;
    use futures_util::StreamExt;
    use tokio::sync::mpsc;
    use tokio_tungstenite::tungstenite::Message as WsMessage;
    use traffic_core::{
        reconcile, DashboardSession, DashboardState, HistoryBuffer, LaneId, LaneSnapshot, Presenter,
        TrafficReport,
    };

    fn dashboard(counts: [u32; 4], history: &mut HistoryBuffer, seq: u64) -> DashboardState {
        let mut report = TrafficReport::default();
        for (lane, count) in LaneId::ALL.iter().zip(counts) {
            report.set_lane(*lane, LaneSnapshot::new(count, 20, Signal::Green));
        }
        let mut state = reconcile(&report, history, Local::now()).unwrap();
        state.seq = seq;
        state
    }

    async fn serve(state: AppState) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, data_routes(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_state_and_indicator_endpoints() {
        let (mut presenter, views) = WatchPresenter::new();
        let (triggers, _rx) = mpsc::channel(4);
        let base = serve(AppState::new(views, triggers)).await;
        let client = reqwest::Client::new();

        let resp = client.get(format!("{base}/api/state")).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NO_CONTENT);

        let mut report = TrafficReport::default();
        for (lane, count) in LaneId::ALL.iter().zip([2, 7, 1, 0]) {
            report.set_lane(*lane, LaneSnapshot::new(count, 20, Signal::Yellow));
        }
        let dashboard = reconcile(&report, &mut HistoryBuffer::new(), Local::now()).unwrap();
        presenter.present(&DashboardSession::new(), &dashboard);

        let body: serde_json::Value = client
            .get(format!("{base}/api/state"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["headline"]["kind"], "clear_first");
        assert_eq!(body["headline"]["lanes"], serde_json::json!(["B"]));
        assert_eq!(body["objects"]["state"], "no_objects");
        assert_eq!(body["lanes"][0]["style"], "warning");

        let body: serde_json::Value = client
            .get(format!("{base}/api/indicator"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["signal"], "RED");
        assert_eq!(body["style"], "danger");
    }

    #[tokio::test]
    async fn test_triggers_reach_poll_loop() {
        let (_presenter, views) = WatchPresenter::new();
        let (triggers, mut rx) = mpsc::channel(4);
        let base = serve(AppState::new(views, triggers)).await;
        let client = reqwest::Client::new();

        let resp = client.post(format!("{base}/api/sample")).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::ACCEPTED);
        assert_eq!(rx.recv().await, Some(PollRequest::Sample));

        let part = reqwest::multipart::Part::bytes(vec![9u8, 9, 9]).file_name("cam1.png");
        let form = reqwest::multipart::Form::new().part(IMAGE_FIELD, part);
        let resp = client
            .post(format!("{base}/api/upload"))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::ACCEPTED);
        assert_eq!(
            rx.recv().await,
            Some(PollRequest::Detection {
                file_name: "cam1.png".to_string(),
                image: vec![9, 9, 9],
            })
        );

        let form = reqwest::multipart::Form::new().text("note", "no image here");
        let resp = client
            .post(format!("{base}/api/upload"))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_trigger_after_loop_stopped_is_unavailable() {
        let (_presenter, views) = WatchPresenter::new();
        let (triggers, rx) = mpsc::channel(4);
        drop(rx);
        let base = serve(AppState::new(views, triggers)).await;

        let resp = reqwest::Client::new()
            .post(format!("{base}/api/sample"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_live_stream_pushes_states_then_closes() {
        let (mut presenter, views) = WatchPresenter::new();
        let (triggers, _rx) = mpsc::channel(4);
        let base = serve(AppState::new(views, triggers)).await;
        let session = DashboardSession::new();
        let mut history = HistoryBuffer::new();

        presenter.present(&session, &dashboard([1, 6, 2, 0], &mut history, 1));

        let url = format!("{}/live", base.replacen("http", "ws", 1));
        let (mut stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();

        let first = stream.next().await.unwrap().unwrap();
        let body: serde_json::Value = serde_json::from_str(first.to_text().unwrap()).unwrap();
        assert_eq!(body["seq"], 1);
        assert_eq!(body["headline"]["lanes"], serde_json::json!(["B"]));

        presenter.present(&session, &dashboard([0, 0, 9, 1], &mut history, 2));
        let second = stream.next().await.unwrap().unwrap();
        let body: serde_json::Value = serde_json::from_str(second.to_text().unwrap()).unwrap();
        assert_eq!(body["seq"], 2);
        assert_eq!(body["headline"]["lanes"], serde_json::json!(["C"]));
        assert_eq!(body["history"]["labels"].as_array().unwrap().len(), 2);

        drop(presenter);
        let last = stream.next().await.unwrap().unwrap();
        assert!(matches!(last, WsMessage::Close(_)), "expected close, got {last:?}");
    }
}
