//! Telemetry Configuration

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub json_logs: bool,
}

impl TelemetryConfig {
    pub fn new(log_level: impl Into<String>, json_logs: bool) -> Self {
        Self {
            log_level: log_level.into(),
            json_logs,
        }
    }
}
