//! Core data models for voyage planning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::spatial::{central_angle_rad, ANTIPODAL_TOLERANCE_RAD, IDENTICAL_TOLERANCE_RAD};

pub const DEFAULT_VESSEL_SPEED_KN: f64 = 15.0;
pub const DEFAULT_WAYPOINTS_COUNT: usize = 20;
pub const DEFAULT_WIND_THRESHOLD_KN: f64 = 30.0;
pub const DEFAULT_WAVE_THRESHOLD_M: f64 = 5.0;
pub const MAX_WAYPOINTS_COUNT: usize = 500;

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "lng", alias = "longitude")]
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Check that the coordinate is finite and within WGS84 bounds.
    pub fn validate(&self, label: &str) -> Result<(), PlanError> {
        if !self.lat.is_finite() || !self.lon.is_finite() {
            return Err(PlanError::InvalidRequest(format!(
                "{label} coordinate must be finite"
            )));
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(PlanError::InvalidRequest(format!(
                "{label} latitude {} outside [-90, 90]",
                self.lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(PlanError::InvalidRequest(format!(
                "{label} longitude {} outside [-180, 180]",
                self.lon
            )));
        }
        Ok(())
    }
}

fn default_vessel_speed() -> f64 {
    DEFAULT_VESSEL_SPEED_KN
}

fn default_waypoints_count() -> usize {
    DEFAULT_WAYPOINTS_COUNT
}

fn default_avoid() -> bool {
    true
}

fn default_wind_threshold() -> f64 {
    DEFAULT_WIND_THRESHOLD_KN
}

fn default_wave_threshold() -> f64 {
    DEFAULT_WAVE_THRESHOLD_M
}

/// A voyage planning request. Never mutated by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub start: Coordinate,
    pub end: Coordinate,
    pub departure_time: DateTime<Utc>,
    /// Nominal speed through water in knots
    #[serde(default = "default_vessel_speed")]
    pub vessel_speed: f64,
    #[serde(default = "default_waypoints_count", alias = "waypoint_count")]
    pub waypoints_count: usize,
    #[serde(default = "default_avoid")]
    pub avoid_extreme_weather: bool,
    /// Wind speed in knots above which a waypoint is hazardous
    #[serde(default = "default_wind_threshold", alias = "wind_threshold")]
    pub extreme_wind_threshold: f64,
    /// Significant wave height in meters above which a waypoint is hazardous
    #[serde(default = "default_wave_threshold", alias = "wave_threshold")]
    pub extreme_wave_threshold: f64,
}

impl RouteRequest {
    /// Create a request with default speed, count and thresholds.
    pub fn new(start: Coordinate, end: Coordinate, departure_time: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            departure_time,
            vessel_speed: DEFAULT_VESSEL_SPEED_KN,
            waypoints_count: DEFAULT_WAYPOINTS_COUNT,
            avoid_extreme_weather: true,
            extreme_wind_threshold: DEFAULT_WIND_THRESHOLD_KN,
            extreme_wave_threshold: DEFAULT_WAVE_THRESHOLD_M,
        }
    }

    /// Reject anything the planner cannot turn into a route.
    pub fn validate(&self) -> Result<(), PlanError> {
        self.start.validate("start")?;
        self.end.validate("end")?;

        let angle = central_angle_rad(&self.start, &self.end);
        if angle < IDENTICAL_TOLERANCE_RAD {
            return Err(PlanError::InvalidRequest(
                "start and end must be different points".to_string(),
            ));
        }
        if std::f64::consts::PI - angle < ANTIPODAL_TOLERANCE_RAD {
            return Err(PlanError::InvalidRequest(
                "start and end are antipodal; great-circle bearing is undefined".to_string(),
            ));
        }

        if !self.vessel_speed.is_finite() || self.vessel_speed <= 0.0 {
            return Err(PlanError::InvalidRequest(format!(
                "vessel_speed must be > 0 knots, got {}",
                self.vessel_speed
            )));
        }
        if self.waypoints_count < 2 {
            return Err(PlanError::InvalidRequest(format!(
                "waypoints_count must be at least 2, got {}",
                self.waypoints_count
            )));
        }
        if self.waypoints_count > MAX_WAYPOINTS_COUNT {
            return Err(PlanError::InvalidRequest(format!(
                "waypoints_count must be at most {}, got {}",
                MAX_WAYPOINTS_COUNT, self.waypoints_count
            )));
        }
        if !self.extreme_wind_threshold.is_finite() || self.extreme_wind_threshold <= 0.0 {
            return Err(PlanError::InvalidRequest(
                "extreme_wind_threshold must be > 0".to_string(),
            ));
        }
        if !self.extreme_wave_threshold.is_finite() || self.extreme_wave_threshold <= 0.0 {
            return Err(PlanError::InvalidRequest(
                "extreme_wave_threshold must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Merged marine forecast for one coordinate and time.
///
/// Every field is optional: the wind/wave and ocean-current providers may
/// supply disjoint fields or fail independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// Knots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f64>,
    /// Degrees, direction the wind comes from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_direction: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_gust: Option<f64>,
    /// Significant wave height in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wave_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wave_direction: Option<f64>,
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wave_period: Option<f64>,
    /// Knots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_speed: Option<f64>,
    /// Degrees, direction the current flows towards
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_direction: Option<f64>,
    /// Eastward component in m/s
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_u: Option<f64>,
    /// Northward component in m/s
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_v: Option<f64>,
    /// Celsius
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// hPa
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    /// mm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precipitation: Option<f64>,
}

impl WeatherSnapshot {
    /// Fill fields missing from `self` with the ones present in `other`.
    ///
    /// Fields already present are never overwritten, so a failed or partial
    /// source cannot erase data retrieved from another one.
    pub fn merge(self, other: WeatherSnapshot) -> WeatherSnapshot {
        WeatherSnapshot {
            wind_speed: self.wind_speed.or(other.wind_speed),
            wind_direction: self.wind_direction.or(other.wind_direction),
            wind_gust: self.wind_gust.or(other.wind_gust),
            wave_height: self.wave_height.or(other.wave_height),
            wave_direction: self.wave_direction.or(other.wave_direction),
            wave_period: self.wave_period.or(other.wave_period),
            current_speed: self.current_speed.or(other.current_speed),
            current_direction: self.current_direction.or(other.current_direction),
            current_u: self.current_u.or(other.current_u),
            current_v: self.current_v.or(other.current_v),
            temperature: self.temperature.or(other.temperature),
            pressure: self.pressure.or(other.pressure),
            precipitation: self.precipitation.or(other.precipitation),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == WeatherSnapshot::default()
    }

    pub fn has_wind_or_waves(&self) -> bool {
        self.wind_speed.is_some() || self.wave_height.is_some()
    }

    pub fn has_currents(&self) -> bool {
        self.current_speed.is_some()
    }
}

/// A discrete point along the planned route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Sequence index, 0-based and contiguous
    pub id: usize,
    pub coordinates: Coordinate,
    pub eta: DateTime<Utc>,
    /// Nautical miles from the previous waypoint
    pub distance_from_prev: f64,
    /// Nautical miles from the start
    pub cumulative_distance: f64,
    pub weather: Option<WeatherSnapshot>,
    #[serde(default)]
    pub is_adjusted: bool,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl Waypoint {
    pub fn new(id: usize, coordinates: Coordinate, eta: DateTime<Utc>) -> Self {
        Self {
            id,
            coordinates,
            eta,
            distance_from_prev: 0.0,
            cumulative_distance: 0.0,
            weather: None,
            is_adjusted: false,
            warnings: Vec::new(),
        }
    }

    /// Attach weather, treating an empty snapshot as "no data".
    pub fn with_weather(mut self, snapshot: WeatherSnapshot) -> Self {
        self.weather = if snapshot.is_empty() {
            None
        } else {
            Some(snapshot)
        };
        self
    }
}

/// Whole-route summary statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteMetrics {
    pub total_distance_nm: f64,
    pub total_distance_km: f64,
    /// Great-circle distance between start and end
    pub direct_distance_nm: f64,
    pub estimated_duration_hours: f64,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub average_speed_knots: f64,
    pub waypoints_adjusted: usize,
    pub max_wind_speed: Option<f64>,
    pub max_wave_height: Option<f64>,
    pub max_current_speed: Option<f64>,
}

/// Severity levels for route warnings, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningSeverity {
    Info,
    Warning,
    Danger,
}

impl WarningSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningSeverity::Info => "info",
            WarningSeverity::Warning => "warning",
            WarningSeverity::Danger => "danger",
        }
    }
}

/// Structured warning attached to a route response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteWarning {
    pub severity: WarningSeverity,
    pub waypoint_id: usize,
    pub message: String,
    /// Parameter that triggered the warning (wind, waves, weather, position)
    pub parameter: String,
    pub value: Option<f64>,
}

/// Complete answer to a [`RouteRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    pub request: RouteRequest,
    pub waypoints: Vec<Waypoint>,
    pub metrics: RouteMetrics,
    pub warnings: Vec<RouteWarning>,
    pub algorithm: String,
    pub calculated_at: DateTime<Utc>,
    pub calculation_time_ms: f64,
}
