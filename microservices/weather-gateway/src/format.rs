//! Plain-text rendering of NWS data

use serde_json::Value;

use crate::model::{AlertFeature, AlertProperties, ForecastPeriod};

pub const BLOCK_SEPARATOR: &str = "\n---\n";

pub fn format_alert(feature: &AlertFeature) -> String {
    let missing = AlertProperties::default();
    let props = feature.properties.as_ref().unwrap_or(&missing);
    format!(
        "\nEvent: {}\nArea: {}\nSeverity: {}\nDescription: {}\nInstructions: {}\n",
        props.event.as_deref().unwrap_or("Unknown"),
        props.area_desc.as_deref().unwrap_or("Unknown"),
        props.severity.as_deref().unwrap_or("Unknown"),
        props.description.as_deref().unwrap_or("No description available"),
        props
            .instruction
            .as_deref()
            .unwrap_or("No specific instructions provided"),
    )
}

pub fn format_period(period: &ForecastPeriod) -> String {
    let temperature = match &period.temperature {
        None => "N/A".to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    };
    format!(
        "\n{}:\nTemperature: {}°{}\nWind: {} {}\nForecast: {}\n",
        period.name.as_deref().unwrap_or("Unknown Period"),
        temperature,
        period.temperature_unit.as_deref().unwrap_or("N/A"),
        period.wind_speed.as_deref().unwrap_or("N/A"),
        period.wind_direction.as_deref().unwrap_or("N/A"),
        period
            .detailed_forecast
            .as_deref()
            .unwrap_or("No detailed forecast available"),
    )
}

pub fn join_blocks<I>(blocks: I) -> String
where
    I: IntoIterator<Item = String>,
{
    blocks.into_iter().collect::<Vec<_>>().join(BLOCK_SEPARATOR)
}
