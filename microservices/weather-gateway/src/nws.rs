//! National Weather Service API client

use nimbus_core::{Coordinates, NimbusError, Result, StateCode};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde_json::Value;
use std::time::Instant;
use tracing::{error, info};

use crate::config::NwsConfig;
use crate::metrics::GatewayMetrics;

const GEO_JSON: &str = "application/geo+json";

/// Shared upstream client. Clones share one connection pool.
#[derive(Clone)]
pub struct NwsClient {
    http: reqwest::Client,
    base_url: String,
    metrics: GatewayMetrics,
}

impl NwsClient {
    pub fn new(config: &NwsConfig, metrics: GatewayMetrics) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GEO_JSON));

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| NimbusError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            metrics,
        })
    }

    pub fn alerts_url(&self, state: &StateCode) -> String {
        format!("{}/alerts/active/area/{}", self.base_url, state)
    }

    pub fn points_url(&self, coords: &Coordinates) -> String {
        format!("{}/points/{}", self.base_url, coords)
    }

    /// GET a JSON document. Every failure is logged and collapses to `None`.
    pub async fn fetch(&self, url: &str) -> Option<Value> {
        self.metrics.upstream_requests.inc();
        let started = Instant::now();
        let outcome = self.try_fetch(url).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.metrics.upstream_latency_ms.record(elapsed_ms);

        match outcome {
            Ok(value) => {
                info!(url = %url, elapsed_ms, "Fetched upstream data");
                Some(value)
            }
            Err(e) => {
                self.metrics.upstream_failures.inc();
                error!(url = %url, error = %e, code = e.error_code(), "Upstream request failed");
                None
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<Value> {
        let response = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                NimbusError::Timeout(e.to_string())
            } else {
                NimbusError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NimbusError::Upstream(format!("HTTP {}: {}", status, body)));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| NimbusError::Upstream(format!("Invalid JSON: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str, timeout: Duration) -> (NwsClient, GatewayMetrics) {
        let metrics = GatewayMetrics::new();
        let config = NwsConfig {
            base_url: base_url.to_string(),
            user_agent: "weather-app/1.0".to_string(),
            timeout,
        };
        (NwsClient::new(&config, metrics.clone()).unwrap(), metrics)
    }

    #[tokio::test]
    async fn test_fetch_sends_headers_and_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/alerts/active/area/CA"))
            .and(header("user-agent", "weather-app/1.0"))
            .and(header("accept", GEO_JSON))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"features": []})))
            .expect(1)
            .mount(&server)
            .await;

        let (nws, metrics) = client(&server.uri(), Duration::from_secs(5));
        let url = nws.alerts_url(&StateCode::parse("ca").unwrap());
        assert_eq!(nws.fetch(&url).await, Some(json!({"features": []})));
        assert_eq!(metrics.upstream_requests.get(), 1);
        assert_eq!(metrics.upstream_failures.get(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failures_yield_none() {
        let server = MockServer::start().await;
        Mock::given(path("/error"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(path("/garbage"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;
        Mock::given(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let (nws, metrics) = client(&server.uri(), Duration::from_millis(200));
        for route in ["/error", "/garbage", "/slow"] {
            let url = format!("{}{}", server.uri(), route);
            assert_eq!(nws.fetch(&url).await, None, "{}", route);
        }
        assert_eq!(metrics.upstream_failures.get(), 3);
    }

    #[tokio::test]
    async fn test_unreachable_upstream() {
        let (nws, _) = client("http://127.0.0.1:1", Duration::from_secs(2));
        assert_eq!(nws.fetch("http://127.0.0.1:1/points/1,1").await, None);
    }

    #[test]
    fn test_points_url() {
        let (nws, _) = client("https://api.weather.gov", Duration::from_secs(1));
        let coords = Coordinates::new(34.05, -118.25).unwrap();
        assert_eq!(nws.points_url(&coords), "https://api.weather.gov/points/34.05,-118.25");
    }
}
