//! Weather Gateway Configuration
//!
//! Built once at startup from the environment, then overridden by CLI flags.
//! Nothing reads the environment after that.

use nimbus_core::{NimbusError, Result, ServiceConfig};
use nimbus_telemetry::TelemetryConfig;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cli::Cli;

pub const DEV_SECRET_KEY: &str = "nimbus-dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub service: ServiceConfig,
    pub nws: NwsConfig,
    pub sse: SseConfig,
    pub auth: AuthConfig,
    pub tls: Option<TlsConfig>,
    pub log_level: String,
    pub json_logs: bool,
}

/// Upstream National Weather Service API
#[derive(Debug, Clone)]
pub struct NwsConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SseConfig {
    pub sse_path: String,
    pub messages_path: String,
    pub keep_alive: Duration,
    pub channel_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Gate `/sse` behind a bearer token
    pub enabled: bool,
    pub secret_key: String,
    pub token_ttl: Duration,
    pub demo_username: String,
    pub demo_password: String,
    pub demo_roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl TlsConfig {
    /// Both files or neither; half a TLS setup is an error.
    pub fn from_parts(key: Option<PathBuf>, cert: Option<PathBuf>) -> Result<Option<Self>> {
        match (key, cert) {
            (Some(key_path), Some(cert_path)) => Ok(Some(Self { cert_path, key_path })),
            (None, None) => Ok(None),
            (Some(_), None) => Err(NimbusError::Config(
                "--ssl-keyfile was given without --ssl-certfile".to_string(),
            )),
            (None, Some(_)) => Err(NimbusError::Config(
                "--ssl-certfile was given without --ssl-keyfile".to_string(),
            )),
        }
    }
}

impl AuthConfig {
    pub fn uses_dev_secret(&self) -> bool {
        self.secret_key == DEV_SECRET_KEY
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let service = ServiceConfig::from_lookup(&lookup)?;

        let nws = NwsConfig {
            base_url: lookup("NWS_API_BASE")
                .unwrap_or_else(|| "https://api.weather.gov".to_string())
                .trim_end_matches('/')
                .to_string(),
            user_agent: lookup("NWS_USER_AGENT").unwrap_or_else(|| "weather-app/1.0".to_string()),
            timeout: Duration::from_secs(parse_var(&lookup, "NWS_TIMEOUT_SECS", 30)?),
        };

        let sse = SseConfig {
            sse_path: route_path(&lookup, "SSE_PATH", "/sse")?,
            messages_path: route_path(&lookup, "MESSAGES_PATH", "/messages/")?,
            keep_alive: Duration::from_secs(parse_var(&lookup, "SSE_KEEPALIVE_SECS", 15)?),
            channel_capacity: parse_var(&lookup, "SESSION_CHANNEL_CAPACITY", 32)?,
        };
        if sse.channel_capacity == 0 {
            return Err(NimbusError::Config(
                "SESSION_CHANNEL_CAPACITY must be at least 1".to_string(),
            ));
        }

        let auth = AuthConfig {
            enabled: parse_bool(&lookup, "AUTH_ENABLED", false)?,
            secret_key: lookup("SECRET_KEY")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEV_SECRET_KEY.to_string()),
            token_ttl: Duration::from_secs(
                parse_var::<u64, _>(&lookup, "ACCESS_TOKEN_EXPIRE_MINUTES", 30)?.saturating_mul(60),
            ),
            demo_username: lookup("DEMO_USERNAME").unwrap_or_else(|| "testuser".to_string()),
            demo_password: lookup("DEMO_PASSWORD").unwrap_or_else(|| "securepassword123".to_string()),
            demo_roles: lookup("DEMO_ROLES")
                .unwrap_or_else(|| "user".to_string())
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect(),
        };

        let tls = TlsConfig::from_parts(
            lookup("SSL_KEYFILE").map(PathBuf::from),
            lookup("SSL_CERTFILE").map(PathBuf::from),
        )?;

        Ok(Self {
            service,
            nws,
            sse,
            auth,
            tls,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            json_logs: parse_bool(&lookup, "JSON_LOGS", true)?,
        })
    }

    /// Layer command-line flags over the environment-derived values
    pub fn apply_cli(mut self, cli: &Cli) -> Result<Self> {
        if let Some(host) = &cli.host {
            self.service.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.service.port = port;
        }
        if let Some(level) = &cli.log_level {
            self.log_level = level.clone();
        }
        if cli.auth {
            self.auth.enabled = true;
        }

        let key = cli
            .ssl_keyfile
            .clone()
            .or_else(|| self.tls.as_ref().map(|t| t.key_path.clone()));
        let cert = cli
            .ssl_certfile
            .clone()
            .or_else(|| self.tls.as_ref().map(|t| t.cert_path.clone()));
        self.tls = TlsConfig::from_parts(key, cert)?;

        Ok(self)
    }

    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig::new(self.log_level.clone(), self.json_logs)
    }

    pub fn scheme(&self) -> &'static str {
        if self.tls.is_some() {
            "https"
        } else {
            "http"
        }
    }
}

fn parse_var<T, F>(lookup: &F, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| NimbusError::Config(format!("Invalid {}: {}", name, e))),
        None => Ok(default),
    }
}

fn parse_bool<F>(lookup: &F, name: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(NimbusError::Config(format!("Invalid {}: {}", name, v))),
        },
    }
}

fn route_path<F>(lookup: &F, name: &str, default: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let path = lookup(name).unwrap_or_else(|| default.to_string());
    if !path.starts_with('/') || path.trim_end_matches('/').is_empty() {
        return Err(NimbusError::Config(format!(
            "{} must be an absolute path below /, got {:?}",
            name, path
        )));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["weather-gateway"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.service.port, 8000);
        assert_eq!(config.nws.base_url, "https://api.weather.gov");
        assert_eq!(config.nws.user_agent, "weather-app/1.0");
        assert_eq!(config.nws.timeout, Duration::from_secs(30));
        assert_eq!(config.sse.sse_path, "/sse");
        assert_eq!(config.sse.messages_path, "/messages/");
        assert_eq!(config.sse.channel_capacity, 32);
        assert!(!config.auth.enabled);
        assert!(config.auth.uses_dev_secret());
        assert_eq!(config.auth.token_ttl, Duration::from_secs(30 * 60));
        assert_eq!(config.auth.demo_roles, vec!["user"]);
        assert!(config.tls.is_none());
        assert!(config.json_logs);
        assert_eq!(config.scheme(), "http");
    }

    #[test]
    fn test_invalid_values() {
        for pairs in [
            [("PORT", "99999")],
            [("NWS_TIMEOUT_SECS", "soon")],
            [("AUTH_ENABLED", "maybe")],
            [("SESSION_CHANNEL_CAPACITY", "0")],
            [("SSE_PATH", "sse")],
        ] {
            let err = GatewayConfig::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(matches!(err, NimbusError::Config(_)), "{:?}", pairs);
        }
    }

    #[test]
    fn test_half_tls_is_rejected() {
        let err = GatewayConfig::from_lookup(lookup(&[("SSL_KEYFILE", "key.pem")])).unwrap_err();
        assert!(matches!(err, NimbusError::Config(_)));

        let config = GatewayConfig::from_lookup(lookup(&[])).unwrap();
        let err = config.apply_cli(&cli(&["--ssl-certfile", "cert.pem"])).unwrap_err();
        assert!(matches!(err, NimbusError::Config(_)));
    }

    #[test]
    fn test_cli_overrides_env() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("HOST", "10.0.0.1"),
            ("PORT", "9000"),
            ("LOG_LEVEL", "warn"),
        ]))
        .unwrap()
        .apply_cli(&cli(&[
            "--host",
            "127.0.0.1",
            "--port",
            "8443",
            "--log-level",
            "debug",
            "--auth",
            "--ssl-keyfile",
            "key.pem",
            "--ssl-certfile",
            "cert.pem",
        ]))
        .unwrap();

        assert_eq!(config.service.host, "127.0.0.1");
        assert_eq!(config.service.port, 8443);
        assert_eq!(config.log_level, "debug");
        assert!(config.auth.enabled);
        assert_eq!(
            config.tls,
            Some(TlsConfig {
                cert_path: PathBuf::from("cert.pem"),
                key_path: PathBuf::from("key.pem"),
            })
        );
        assert_eq!(config.scheme(), "https");
    }

    #[test]
    fn test_telemetry_follows_config_and_cli() {
        let config = GatewayConfig::from_lookup(lookup(&[("LOG_LEVEL", "warn"), ("JSON_LOGS", "0")]))
            .unwrap()
            .apply_cli(&cli(&["--log-level", "debug"]))
            .unwrap();

        let telemetry = config.telemetry();
        assert_eq!(telemetry.log_level, "debug");
        assert!(!telemetry.json_logs);
    }

    #[test]
    fn test_demo_roles_are_split() {
        let config = GatewayConfig::from_lookup(lookup(&[("DEMO_ROLES", "user, admin,")])).unwrap();
        assert_eq!(config.auth.demo_roles, vec!["user", "admin"]);
    }
}
