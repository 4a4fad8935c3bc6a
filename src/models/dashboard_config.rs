use serde::{Deserialize, Serialize};
use std::time::Duration;

use traffic_core::core::constants::{SAMPLE_POLL_INTERVAL, STATUS_POLL_INTERVAL};
use traffic_core::PollSchedule;

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub name: String,
    pub id: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    pub connection: Connection,
    pub backend: BackendConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Connection {
    pub ip: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
    /// 0 turns the single-lane indicator off.
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
    /// Unset means requests may hang; the timers keep firing regardless.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    #[serde(default)]
    pub offline: bool,
}

fn default_sample_interval_ms() -> u64 {
    SAMPLE_POLL_INTERVAL.as_millis() as u64
}

fn default_status_interval_ms() -> u64 {
    STATUS_POLL_INTERVAL.as_millis() as u64
}

impl BackendConfig {
    pub fn schedule(&self) -> PollSchedule {
        PollSchedule {
            sample_interval: Duration::from_millis(self.sample_interval_ms.max(1)),
            status_interval: (self.status_interval_ms > 0)
                .then(|| Duration::from_millis(self.status_interval_ms)),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}
