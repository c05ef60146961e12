//! Core domain types shared by the gateway and the MCP SDK

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Input rejected at the parsing boundary.
///
/// The `Display` text is user-facing: tool and REST callers receive it
/// verbatim as the operation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid state code format. Please provide a two-letter US state code.")]
    InvalidStateCode,

    #[error("Invalid latitude value. Must be between -90 and 90.")]
    LatitudeOutOfRange,

    #[error("Invalid longitude value. Must be between -180 and 180.")]
    LongitudeOutOfRange,
}

/// Two-letter US state (or territory/marine area) code, always uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateCode(String);

impl StateCode {
    /// Accepts exactly two ASCII letters in any case.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let mut chars = raw.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(a), Some(b), None) if a.is_ascii_alphabetic() && b.is_ascii_alphabetic() => {
                Ok(Self(raw.to_ascii_uppercase()))
            }
            _ => Err(ValidationError::InvalidStateCode),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A point on the globe within physical latitude/longitude ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    /// Latitude is checked before longitude. NaN is never in range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::LatitudeOutOfRange);
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::LongitudeOutOfRange);
        }
        Ok(Self { latitude, longitude })
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// Identity of one live SSE connection.
///
/// Rendered as 32 hex digits without hyphens; parsing accepts any UUID form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_code_uppercases() {
        assert_eq!(StateCode::parse("ca").unwrap().as_str(), "CA");
        assert_eq!(StateCode::parse("Ny").unwrap().as_str(), "NY");
        assert_eq!(StateCode::parse("TX").unwrap().to_string(), "TX");
    }

    #[test]
    fn test_state_code_rejects_bad_input() {
        for raw in ["", "C", "CAL", "C1", "12", " CA", "C-", "é1", "ÉÉ"] {
            assert_eq!(
                StateCode::parse(raw),
                Err(ValidationError::InvalidStateCode),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_coordinates_ranges() {
        assert!(Coordinates::new(90.0, 180.0).is_ok());
        assert!(Coordinates::new(-90.0, -180.0).is_ok());
        assert_eq!(Coordinates::new(91.0, 0.0), Err(ValidationError::LatitudeOutOfRange));
        assert_eq!(Coordinates::new(0.0, -180.5), Err(ValidationError::LongitudeOutOfRange));
        assert_eq!(Coordinates::new(f64::NAN, 0.0), Err(ValidationError::LatitudeOutOfRange));
        // latitude wins when both are out of range
        assert_eq!(Coordinates::new(100.0, 200.0), Err(ValidationError::LatitudeOutOfRange));
    }

    #[test]
    fn test_coordinates_display() {
        let point = Coordinates::new(39.7456, -97.0892).unwrap();
        assert_eq!(point.to_string(), "39.7456,-97.0892");
    }

    #[test]
    fn test_session_id_roundtrip() {
        let id = SessionId::generate();
        let rendered = id.to_string();
        assert_eq!(rendered.len(), 32);
        assert!(!rendered.contains('-'));
        assert_eq!(rendered.parse::<SessionId>().unwrap(), id);
        assert!("not-a-session".parse::<SessionId>().is_err());
    }
}
