//! Weather operations shared by the MCP tools and the REST facade.
//!
//! Both operations always produce a human-readable string. Bad input and
//! upstream trouble are reported in that string, never as errors.

use nimbus_core::{Coordinates, StateCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::format::{format_alert, format_period, join_blocks};
use crate::model::{AlertFeature, AlertsResponse, ForecastPeriod, ForecastResponse, PointsResponse};
use crate::nws::NwsClient;

/// Forecast periods surfaced per request
pub const MAX_FORECAST_PERIODS: usize = 5;

pub const ALERTS_UNAVAILABLE: &str = "Unable to fetch alerts or no alerts found.";
pub const ALERTS_BAD_FORMAT: &str = "Unable to fetch alerts or unexpected data format.";
pub const NO_ACTIVE_ALERTS: &str = "No active alerts for this state.";
pub const GRID_UNAVAILABLE: &str = "Unable to fetch forecast grid data for this location.";
pub const FORECAST_LINK_MISSING: &str = "Unable to find forecast data for this location.";
pub const FORECAST_UNAVAILABLE: &str = "Unable to fetch detailed forecast data.";
pub const FORECAST_BAD_FORMAT: &str = "Unable to fetch detailed forecast or unexpected data format.";
pub const NO_FORECAST_PERIODS: &str = "No forecast periods available for this location.";

#[derive(Clone)]
pub struct WeatherService {
    nws: NwsClient,
}

impl WeatherService {
    pub fn new(nws: NwsClient) -> Self {
        Self { nws }
    }

    /// Active alerts for a two-letter US state code
    pub async fn get_alerts(&self, state: &str) -> String {
        let state = match StateCode::parse(state) {
            Ok(state) => state,
            Err(e) => return e.to_string(),
        };

        let Some(data) = self.nws.fetch(&self.nws.alerts_url(&state)).await else {
            return ALERTS_UNAVAILABLE.to_string();
        };

        let features = match decode::<AlertsResponse>(data) {
            Some(AlertsResponse {
                features: Some(features),
            }) => features,
            _ => {
                warn!(state = %state, "Unexpected alerts payload");
                return ALERTS_BAD_FORMAT.to_string();
            }
        };

        if features.is_empty() {
            return NO_ACTIVE_ALERTS.to_string();
        }

        debug!(state = %state, count = features.len(), "Formatting alerts");
        join_blocks(
            features
                .into_iter()
                .map(|raw| format_alert(&AlertFeature::from_raw(raw))),
        )
    }

    /// Forecast for a point, resolved through the NWS grid lookup
    pub async fn get_forecast(&self, latitude: f64, longitude: f64) -> String {
        let coords = match Coordinates::new(latitude, longitude) {
            Ok(coords) => coords,
            Err(e) => return e.to_string(),
        };

        let Some(points) = self.nws.fetch(&self.nws.points_url(&coords)).await else {
            return GRID_UNAVAILABLE.to_string();
        };

        let forecast_url = decode::<PointsResponse>(points)
            .and_then(|p| p.properties)
            .and_then(|p| p.forecast)
            .filter(|url| !url.is_empty());
        let Some(forecast_url) = forecast_url else {
            warn!(coords = %coords, "Points payload has no forecast link");
            return FORECAST_LINK_MISSING.to_string();
        };

        let Some(forecast) = self.nws.fetch(&forecast_url).await else {
            return FORECAST_UNAVAILABLE.to_string();
        };

        let periods = decode::<ForecastResponse>(forecast)
            .and_then(|f| f.properties)
            .and_then(|p| p.periods);
        let Some(periods) = periods else {
            warn!(coords = %coords, "Unexpected forecast payload");
            return FORECAST_BAD_FORMAT.to_string();
        };

        if periods.is_empty() {
            return NO_FORECAST_PERIODS.to_string();
        }

        join_blocks(
            periods
                .into_iter()
                .take(MAX_FORECAST_PERIODS)
                .map(|raw| format_period(&ForecastPeriod::from_raw(raw))),
        )
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Option<T> {
    serde_json::from_value(value)
        .map_err(|e| debug!(error = %e, "Payload did not match the expected shape"))
        .ok()
}
