pub mod constants;
pub mod error;
pub mod format;
pub mod history;
pub mod poller;
pub mod reconciler;
pub mod sample;
pub mod sequence;
pub mod status;
