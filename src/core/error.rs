// Error handling for the dashboard core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DashboardError>;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Malformed report: {0}")]
    MalformedReport(String),
}

impl DashboardError {
    /// Short, stable name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DashboardError::Transport(_) => "transport",
            DashboardError::Decode(_) => "decode",
            DashboardError::MalformedReport(_) => "malformed_report",
        }
    }
}
