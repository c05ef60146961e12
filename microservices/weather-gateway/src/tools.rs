//! Weather MCP Tools

use async_trait::async_trait;
use nimbus_mcp_sdk::tool::{Tool, ToolError, ToolResult};
use nimbus_mcp_sdk::ToolRegistry;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::weather::WeatherService;

/// Registry with every weather tool, in listing order
pub fn weather_tools(weather: WeatherService) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry
        .register(GetAlertsTool::new(weather.clone()))
        .register(GetForecastTool::new(weather));
    registry
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidInput(e.to_string()))
}

pub struct GetAlertsTool {
    weather: WeatherService,
}

#[derive(Deserialize)]
struct AlertsArgs {
    state: String,
}

impl GetAlertsTool {
    pub fn new(weather: WeatherService) -> Self {
        Self { weather }
    }
}

#[async_trait]
impl Tool for GetAlertsTool {
    fn name(&self) -> &str { "get_alerts" }
    fn description(&self) -> &str { "Get weather alerts for a US state." }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "state": { "type": "string", "description": "Two-letter US state code (e.g. CA, NY)" }
            },
            "required": ["state"]
        })
    }
    async fn execute(&self, args: Value) -> Result<ToolResult, ToolError> {
        let args: AlertsArgs = parse_args(args)?;
        Ok(ToolResult::text(self.weather.get_alerts(&args.state).await))
    }
}

pub struct GetForecastTool {
    weather: WeatherService,
}

#[derive(Deserialize)]
struct ForecastArgs {
    latitude: f64,
    longitude: f64,
}

impl GetForecastTool {
    pub fn new(weather: WeatherService) -> Self {
        Self { weather }
    }
}

#[async_trait]
impl Tool for GetForecastTool {
    fn name(&self) -> &str { "get_forecast" }
    fn description(&self) -> &str { "Get weather forecast for a location." }
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "latitude": { "type": "number", "description": "Latitude of the location (e.g. 34.0522)" },
                "longitude": { "type": "number", "description": "Longitude of the location (e.g. -118.2437)" }
            },
            "required": ["latitude", "longitude"]
        })
    }
    async fn execute(&self, args: Value) -> Result<ToolResult, ToolError> {
        let args: ForecastArgs = parse_args(args)?;
        Ok(ToolResult::text(
            self.weather.get_forecast(args.latitude, args.longitude).await,
        ))
    }
}
