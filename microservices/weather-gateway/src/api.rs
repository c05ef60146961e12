//! Weather Gateway REST API

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use nimbus_core::{DependencyStatus, HealthStatus, NimbusError, ReadinessStatus, Result};
use nimbus_mcp_sdk::{McpSession, ServerInfo, SessionRegistry};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::auth::{self, AuthService, AuthenticatedUser};
use crate::config::GatewayConfig;
use crate::metrics::GatewayMetrics;
use crate::nws::NwsClient;
use crate::server;
use crate::tools::weather_tools;
use crate::weather::WeatherService;

pub const SERVER_NAME: &str = "Nimbus Weather MCP";
pub const MCP_SERVER_NAME: &str = "weather";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub weather: WeatherService,
    pub sessions: SessionRegistry,
    pub mcp: Arc<McpSession>,
    pub auth: AuthService,
    pub metrics: GatewayMetrics,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let metrics = GatewayMetrics::new();
        let nws = NwsClient::new(&config.nws, metrics.clone())?;
        let weather = WeatherService::new(nws);
        let mcp = McpSession::new(
            weather_tools(weather.clone()),
            ServerInfo::new(MCP_SERVER_NAME, env!("CARGO_PKG_VERSION")),
        );

        Ok(Self {
            sessions: SessionRegistry::new(config.sse.channel_capacity),
            auth: AuthService::new(&config.auth)?,
            config: Arc::new(config),
            weather,
            mcp: Arc::new(mcp),
            metrics,
            started_at: Instant::now(),
        })
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            healthy: true,
            service_id: self.config.service.service_name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
        }
    }

    /// Nothing is probed here; the upstream is reported with its observed latency.
    pub fn ready(&self) -> ReadinessStatus {
        let latency = &self.metrics.upstream_latency_ms;
        ReadinessStatus {
            ready: true,
            dependencies: vec![DependencyStatus {
                name: "nws".to_string(),
                available: true,
                latency_ms: (latency.count() > 0).then(|| latency.mean() as u64),
            }],
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let sse_path = state.config.sse.sse_path.clone();
    let messages_base = state
        .config
        .sse
        .messages_path
        .trim_end_matches('/')
        .to_string();

    let mut sse = Router::new().route(&sse_path, get(server::sse_handler));
    if state.config.auth.enabled {
        sse = sse.route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));
    }

    let protected = Router::new()
        .route("/users/me", get(auth::me))
        .route("/admin/sessions", get(admin_sessions))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    Router::new()
        // Info
        .route("/", get(homepage))
        .route("/about", get(about))
        .route("/status", get(status))
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Weather
        .route("/get_alerts", get(get_alerts))
        .route("/get_forecast", get(get_forecast))
        // Auth
        .route("/token", post(auth::token))
        // MCP
        .route(&messages_base, get(messages_docs).post(server::message_handler))
        .route(&format!("{}/", messages_base), post(server::message_handler))
        .merge(sse)
        .merge(protected)
        .with_state(state)
}

/// HTTP rendering of [`NimbusError`]
#[derive(Debug)]
pub struct ApiError(pub NimbusError);

impl From<NimbusError> for ApiError {
    fn from(err: NimbusError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let detail = match &self.0 {
            NimbusError::Auth(msg) | NimbusError::Forbidden(msg) | NimbusError::Validation(msg) => {
                msg.clone()
            }
            other => other.to_string(),
        };

        let mut response = (status, Json(json!({ "detail": detail }))).into_response();
        if matches!(self.0, NimbusError::Auth(_)) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

async fn homepage() -> Html<String> {
    info!("Homepage requested");
    Html(format!(
        "<h1>{}</h1><p>Welcome to the SSE demo with MCP integration.</p>",
        SERVER_NAME
    ))
}

async fn about() -> String {
    format!(
        "About {}: A demonstration of Server-Sent Events with Model Context Protocol integration.",
        SERVER_NAME
    )
}

async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "running",
        "server": SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "active_sessions": state.sessions.len(),
    }))
}

async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(state.health())
}

async fn ready(State(state): State<AppState>) -> Json<ReadinessStatus> {
    Json(state.ready())
}

async fn messages_docs(State(state): State<AppState>) -> String {
    format!(
        "Messages endpoint for SSE communication. POST JSON-RPC messages to {}?session_id=<id>, \
         using the id announced in the endpoint event of {}. Replies arrive on the event stream.",
        state.config.sse.messages_path, state.config.sse.sse_path
    )
}

#[derive(Debug, Deserialize)]
struct AlertsQuery {
    state: String,
}

async fn get_alerts(State(state): State<AppState>, Query(query): Query<AlertsQuery>) -> Json<String> {
    Json(state.weather.get_alerts(&query.state).await)
}

#[derive(Debug, Deserialize)]
struct ForecastQuery {
    latitude: f64,
    longitude: f64,
}

async fn get_forecast(
    State(state): State<AppState>,
    Query(query): Query<ForecastQuery>,
) -> Json<String> {
    Json(state.weather.get_forecast(query.latitude, query.longitude).await)
}

async fn admin_sessions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    user.require_role("admin")?;
    Ok(Json(json!({
        "active_sessions": state.sessions.len(),
        "sessions_total": state.metrics.sessions_total.get(),
        "metrics": state.metrics.snapshot(),
    })))
}
