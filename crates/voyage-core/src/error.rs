//! Error taxonomy for voyage planning.
//!
//! Only [`PlanError`] is ever surfaced to callers of the planner. Weather
//! problems are carried as data ([`WeatherError`]) so a degraded source
//! lowers answer quality without failing the plan.

use thiserror::Error;

/// Caller-visible planning failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// Malformed coordinates, degenerate endpoints, bad speed or count.
    #[error("invalid route request: {0}")]
    InvalidRequest(String),
    /// Numeric edge case that validation should have prevented.
    #[error("route computation failed: {0}")]
    Computation(String),
}

/// Geometry that cannot produce a route.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeodesyError {
    #[error("degenerate route: start and end are identical")]
    IdenticalEndpoints,
    #[error("degenerate route: start and end are antipodal")]
    AntipodalEndpoints,
    #[error("interpolation fraction {0} outside [0, 1]")]
    FractionOutOfRange(f64),
    #[error("at least 2 waypoints are required, got {0}")]
    TooFewWaypoints(usize),
}

impl From<GeodesyError> for PlanError {
    fn from(err: GeodesyError) -> Self {
        PlanError::InvalidRequest(err.to_string())
    }
}

/// Failure of one upstream weather source or of the cache.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeatherError {
    #[error("{source_name} unavailable: {reason}")]
    Upstream {
        source_name: String,
        reason: String,
    },
    #[error("{source_name} timed out after {after_ms} ms")]
    Timeout { source_name: String, after_ms: u64 },
    #[error("{source_name} returned unreadable data: {reason}")]
    Decode {
        source_name: String,
        reason: String,
    },
    #[error("weather cache error: {0}")]
    Cache(String),
}

impl WeatherError {
    pub fn upstream(source_name: impl Into<String>, reason: impl ToString) -> Self {
        WeatherError::Upstream {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn decode(source_name: impl Into<String>, reason: impl ToString) -> Self {
        WeatherError::Decode {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}
