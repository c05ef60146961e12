//! Configuration management for services

use crate::error::{NimbusError, Result};
use serde::Deserialize;
use std::net::{SocketAddr, ToSocketAddrs};

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub service_name: String,
    pub host: String,
    pub port: u16,
}

impl ServiceConfig {
    /// Build from an arbitrary key lookup; the gateway passes its own so the
    /// environment is read in one place.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            service_name: lookup("SERVICE_NAME").unwrap_or_else(|| "weather-gateway".to_string()),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("PORT")
                .unwrap_or_else(|| "8000".to_string())
                .parse()
                .map_err(|e| NimbusError::Config(format!("Invalid PORT: {}", e)))?,
        })
    }

    /// Resolve `host:port` into a socket address. Host names such as
    /// `localhost` are resolved once, at startup.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let invalid = |reason: String| {
            NimbusError::Config(format!("Invalid bind address {}:{}: {}", self.host, self.port, reason))
        };
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| invalid(e.to_string()))?
            .next()
            .ok_or_else(|| invalid("no address found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert_eq!(config.bind_addr().unwrap().port(), 8000);
    }

    #[test]
    fn test_invalid_port() {
        let err = ServiceConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, NimbusError::Config(_)));
    }

    #[test]
    fn test_invalid_host() {
        let config = ServiceConfig::from_lookup(lookup(&[("HOST", "not a host")])).unwrap();
        assert!(config.bind_addr().is_err());
    }
}
