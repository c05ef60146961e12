//! Gateway metrics

use nimbus_telemetry::{Counter, Gauge, Histogram, MetricSnapshot};

#[derive(Clone)]
pub struct GatewayMetrics {
    pub sessions_active: Gauge,
    pub sessions_total: Counter,
    pub upstream_requests: Counter,
    pub upstream_failures: Counter,
    pub upstream_latency_ms: Histogram,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self {
            sessions_active: Gauge::new("sessions_active"),
            sessions_total: Counter::new("sessions_total"),
            upstream_requests: Counter::new("upstream_requests"),
            upstream_failures: Counter::new("upstream_failures"),
            upstream_latency_ms: Histogram::new("upstream_latency_ms"),
        }
    }

    pub fn snapshot(&self) -> Vec<MetricSnapshot> {
        vec![
            self.sessions_active.snapshot(),
            self.sessions_total.snapshot(),
            self.upstream_requests.snapshot(),
            self.upstream_failures.snapshot(),
            MetricSnapshot {
                name: "upstream_latency_ms_p95".to_string(),
                value: self.upstream_latency_ms.percentile(95.0),
            },
        ]
    }
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new()
    }
}
