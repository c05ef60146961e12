//! Error types for Nimbus services

use thiserror::Error;

pub type Result<T> = std::result::Result<T, NimbusError>;

#[derive(Error, Debug)]
pub enum NimbusError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Authorization error: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Timeout: {0}")]
    Timeout(String),
}

impl NimbusError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Auth(_) => 401,
            Self::Forbidden(_) => 403,
            Self::Upstream(_) => 502,
            Self::Timeout(_) => 504,
            _ => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Network(_) => "NETWORK_ERROR",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::Auth(_) => "AUTH_ERROR",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Timeout(_) => "TIMEOUT",
        }
    }
}

impl From<std::io::Error> for NimbusError {
    fn from(err: std::io::Error) -> Self {
        NimbusError::Network(err.to_string())
    }
}

impl From<crate::domain::ValidationError> for NimbusError {
    fn from(err: crate::domain::ValidationError) -> Self {
        NimbusError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(NimbusError::Auth("bad token".into()).status_code(), 401);
        assert_eq!(NimbusError::Forbidden("admin".into()).status_code(), 403);
        assert_eq!(NimbusError::Validation("x".into()).status_code(), 400);
        assert_eq!(NimbusError::Config("PORT".into()).status_code(), 500);
    }

    #[test]
    fn test_validation_error_conversion() {
        let err: NimbusError = crate::domain::ValidationError::LatitudeOutOfRange.into();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("latitude"));
    }
}
