//! Nimbus Core - Shared domain types and service infrastructure
//!
//! This crate provides:
//! - Standard service trait the gateway implements
//! - Validated domain types (StateCode, Coordinates, SessionId)
//! - Error handling utilities
//! - Configuration management

pub mod config;
pub mod domain;
pub mod error;
pub mod service;

pub use config::ServiceConfig;
pub use domain::*;
pub use error::{NimbusError, Result};
pub use service::{DependencyStatus, HealthStatus, MicroserviceRuntime, NimbusService, ReadinessStatus};
