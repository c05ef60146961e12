//! NWS payload shapes
//!
//! Every field is optional: JSON `null` and absent keys both decode to `None`.
//! Text fields accept any JSON value; non-strings keep their JSON rendering.
//! Alert features and forecast periods stay raw until each one is decoded on
//! its own, so one odd record cannot sink the rest.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertsResponse {
    #[serde(default)]
    pub features: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertFeature {
    #[serde(default)]
    pub properties: Option<AlertProperties>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertProperties {
    #[serde(default, deserialize_with = "lenient_text")]
    pub event: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub area_desc: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub severity: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub instruction: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PointsResponse {
    #[serde(default)]
    pub properties: Option<PointProperties>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PointProperties {
    #[serde(default, deserialize_with = "lenient_text")]
    pub forecast: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub properties: Option<ForecastProperties>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastProperties {
    #[serde(default)]
    pub periods: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPeriod {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    /// Printed exactly as received (`72`, `-3`, `68.5`)
    #[serde(default)]
    pub temperature: Option<Value>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub temperature_unit: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub wind_speed: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub wind_direction: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub detailed_forecast: Option<String>,
}

impl AlertFeature {
    /// Anything that is not an alert object renders with every default
    pub fn from_raw(raw: Value) -> Self {
        serde_json::from_value(raw).unwrap_or_default()
    }
}

impl ForecastPeriod {
    pub fn from_raw(raw: Value) -> Self {
        serde_json::from_value(raw).unwrap_or_default()
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    })
}
