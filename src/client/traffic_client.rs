use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

use traffic_core::core::constants::IMAGE_FIELD;
use traffic_core::{DashboardError, PollRequest, ReportSource, Result, TrafficReport};

/// Polls the traffic-analysis backend over HTTP.
#[derive(Clone)]
pub struct HttpReportSource {
    client: Client,
    url: String,
}

impl HttpReportSource {
    pub fn new(url: &str, timeout: Option<Duration>) -> std::result::Result<Self, String> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| format!("HTTP client init failed: {e}"))?;

        info!("Polling traffic backend at {}", url);

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

impl ReportSource for HttpReportSource {
    fn fetch(
        &self,
        request: PollRequest,
    ) -> impl Future<Output = Result<TrafficReport>> + Send + 'static {
        let client = self.client.clone();
        let url = self.url.clone();
        async move { fetch_report(&client, &url, request).await }
    }
}

async fn fetch_report(client: &Client, url: &str, request: PollRequest) -> Result<TrafficReport> {
    let builder = client.post(url);

    let builder = match request {
        PollRequest::Sample => builder,
        PollRequest::Detection { file_name, image } => {
            debug!("Uploading {} ({} bytes) for detection", file_name, image.len());
            let part = Part::bytes(image).file_name(file_name);
            builder.multipart(Form::new().part(IMAGE_FIELD, part))
        }
    };

    let body = builder
        .send()
        .await
        .map_err(|e| DashboardError::Transport(format!("HTTP Error: {e}")))?
        .error_for_status()
        .map_err(|e| DashboardError::Transport(format!("Server returned error: {e}")))?
        .bytes()
        .await
        .map_err(|e| DashboardError::Transport(format!("Body read failed: {e}")))?;

    TrafficReport::from_json(&body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::multipart::MultipartRejection;
    use axum::extract::Multipart;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use traffic_core::{LaneId, Signal};

    const REPORT: &str = r#"{
        "lane_A": {"vehicle_count": 4, "signal": "GREEN", "time_left": 30},
        "lane_B": {"vehicle_count": 2, "signal": "YELLOW", "time_left": 45},
        "lane_C": {"vehicle_count": 0, "signal": "RED", "time_left": 20},
        "lane_D": {"vehicle_count": 1, "signal": "RED", "time_left": 25},
        "object_counts": {"car": 7}
    }"#;

    // Sample polls carry no body, so the form is optional.
    async fn traffic(form: std::result::Result<Multipart, MultipartRejection>) -> (StatusCode, String) {
        let mut report = REPORT.to_string();
        let Ok(mut form) = form else {
            return (StatusCode::OK, report);
        };
        while let Ok(Some(field)) = form.next_field().await {
            if field.name() == Some(IMAGE_FIELD) {
                let name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.unwrap();
                // only the expected upload raises an emergency
                if name == "ambulance.jpg" && bytes.len() == 3 {
                    report = report.replacen('{', r#"{"emergency_detected": true, "emergency_lane": "C","#, 1);
                }
            }
        }
        (StatusCode::OK, report)
    }

    async fn spawn_backend() -> String {
        let app = Router::new()
            .route("/api/traffic", post(traffic))
            .route("/broken", post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }))
            .route("/garbage", post(|| async { "<html>not json</html>" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_sample_request_decodes_report() {
        let base = spawn_backend().await;
        let source = HttpReportSource::new(&format!("{base}/api/traffic"), None).unwrap();

        let report = source.fetch(PollRequest::Sample).await.unwrap();
        assert_eq!(report.lane(LaneId::A).unwrap().signal, Signal::Green);
        assert!(!report.is_emergency());
    }

    #[tokio::test]
    async fn test_detection_request_sends_image_part() {
        let base = spawn_backend().await;
        let source = HttpReportSource::new(&format!("{base}/api/traffic"), None).unwrap();

        let report = source
            .fetch(PollRequest::Detection {
                file_name: "ambulance.jpg".to_string(),
                image: vec![1, 2, 3],
            })
            .await
            .unwrap();
        assert!(report.is_emergency());
        assert_eq!(report.emergency_lane, Some(LaneId::C));
    }

    #[tokio::test]
    async fn test_error_kinds() {
        let base = spawn_backend().await;

        let broken = HttpReportSource::new(&format!("{base}/broken"), None).unwrap();
        let err = broken.fetch(PollRequest::Sample).await.unwrap_err();
        assert_eq!(err.kind(), "transport");

        let garbage = HttpReportSource::new(&format!("{base}/garbage"), None).unwrap();
        let err = garbage.fetch(PollRequest::Sample).await.unwrap_err();
        assert_eq!(err.kind(), "decode");

        let down = HttpReportSource::new("http://127.0.0.1:1/api/traffic", Some(Duration::from_secs(2)))
            .unwrap();
        let err = down.fetch(PollRequest::Sample).await.unwrap_err();
        assert_eq!(err.kind(), "transport");
    }
}
