//! Weather Gateway
//!
//! MCP server exposing National Weather Service data to LLM clients:
//! - Tools: get_alerts, get_forecast
//! - Transport: HTTP+SSE (`GET /sse`, `POST /messages`)
//! - REST facade over the same operations
//! - Optional bearer-token gate on the SSE endpoint
//!
//! Serves HTTPS when both --ssl-keyfile and --ssl-certfile are given.

use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use nimbus_core::{HealthStatus, MicroserviceRuntime, NimbusError, NimbusService, ReadinessStatus, Result};
use std::sync::Arc;
use tracing::info;

mod api;
mod auth;
mod cli;
mod config;
mod format;
mod metrics;
mod model;
mod nws;
mod server;
mod tools;
mod weather;


use api::AppState;
use cli::Cli;
use config::GatewayConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = GatewayConfig::from_env()?.apply_cli(&cli)?;

    nimbus_telemetry::init_tracing(&config.service.service_name, &config.telemetry())
        .map_err(|e| NimbusError::Config(e.to_string()))?;

    // The TLS listener and the upstream client share one rustls crypto backend.
    let _ = rustls::crypto::ring::default_provider().install_default();

    info!("Starting Weather Gateway");

    let service = Arc::new(WeatherGatewayService::new(config)?);
    MicroserviceRuntime::run(service).await
}

pub struct WeatherGatewayService {
    state: AppState,
}

impl WeatherGatewayService {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        Ok(Self {
            state: AppState::new(config)?,
        })
    }
}

#[async_trait::async_trait]
impl NimbusService for WeatherGatewayService {
    fn service_id(&self) -> &'static str {
        "weather-gateway"
    }

    async fn health(&self) -> HealthStatus {
        self.state.health()
    }

    async fn ready(&self) -> ReadinessStatus {
        self.state.ready()
    }

    async fn shutdown(&self) -> Result<()> {
        info!(
            active_sessions = self.state.sessions.len(),
            "Shutting down Weather Gateway"
        );
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        let config = self.state.config.clone();
        let addr = config.service.bind_addr()?;
        let app = api::create_router(self.state.clone());

        info!(
            http = %addr,
            scheme = config.scheme(),
            sse = %config.sse.sse_path,
            messages = %config.sse.messages_path,
            auth = config.auth.enabled,
            "Starting Weather Gateway server"
        );

        match &config.tls {
            Some(tls) => {
                let rustls = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
                    .await
                    .map_err(|e| {
                        NimbusError::Config(format!(
                            "Failed to load TLS material ({}, {}): {}",
                            tls.cert_path.display(),
                            tls.key_path.display(),
                            e
                        ))
                    })?;
                axum_server::bind_rustls(addr, rustls)
                    .serve(app.into_make_service())
                    .await?;
            }
            None => {
                let listener = tokio::net::TcpListener::bind(addr).await?;
                axum::serve(listener, app).await?;
            }
        }

        Ok(())
    }
}
