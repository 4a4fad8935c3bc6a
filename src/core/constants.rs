// Dashboard constants

use std::time::Duration;

// Points kept per lane in the rolling chart
pub const HISTORY_CAPACITY: usize = 20;

// Reference polling cadence
pub const SAMPLE_POLL_INTERVAL: Duration = Duration::from_millis(2000);
pub const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(5000);

// Chart axis label format (wall-clock, local time)
pub const TIME_LABEL_FORMAT: &str = "%H:%M:%S";

// Multipart field the backend reads the uploaded frame from
pub const IMAGE_FIELD: &str = "image";

// Sample mode: vehicle types counted per lane
pub const SAMPLE_VEHICLE_TYPES: [&str; 5] = ["car", "bus", "truck", "motorcycle", "person"];
pub const SAMPLE_MAX_PER_TYPE: u32 = 20;
pub const SAMPLE_TIME_LEFT_RANGE: (u32, u32) = (10, 60);
