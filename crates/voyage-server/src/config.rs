//! Server configuration from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use voyage_core::adjust::{AdjustmentConfig, SidePolicy};
use voyage_core::hazard::DEFAULT_DANGER_RATIO;

use crate::cache::{MAX_BUCKET_MINUTES, MAX_GRID_DEG};

pub const DEFAULT_MARINE_URL: &str = "https://marine-api.open-meteo.com/v1/marine";
pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const MAX_PLAN_DEADLINE: Duration = Duration::from_secs(600);
pub const MAX_FETCH_TIMEOUT: Duration = Duration::from_secs(120);

/// Which wind/wave provider backs the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherProvider {
    OpenMeteo,
    Synthetic,
}

impl FromStr for WeatherProvider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open-meteo" | "open_meteo" | "openmeteo" => Ok(WeatherProvider::OpenMeteo),
            "synthetic" | "mock" => Ok(WeatherProvider::Synthetic),
            other => Err(format!("unknown weather provider: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub weather_provider: WeatherProvider,
    pub marine_url: String,
    pub forecast_url: String,
    /// Per-source fetch timeout
    pub fetch_timeout: Duration,
    /// Overall bound on one plan
    pub plan_deadline: Duration,
    /// Waypoints resolved concurrently (1..=32)
    pub fetch_concurrency: usize,
    pub cache_ttl: Duration,
    /// TTL for gridded layer samples
    pub layer_cache_ttl: Duration,
    pub cache_max_entries: usize,
    /// Spatial rounding of cache keys in degrees
    pub cache_grid_deg: f64,
    /// Temporal rounding of cache keys in minutes
    pub cache_time_bucket_min: i64,
    pub avoidance_offset_nm: f64,
    pub max_offset_nm: f64,
    pub offset_side: SidePolicy,
    pub danger_ratio: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8000,
            weather_provider: WeatherProvider::OpenMeteo,
            marine_url: DEFAULT_MARINE_URL.to_string(),
            forecast_url: DEFAULT_FORECAST_URL.to_string(),
            fetch_timeout: Duration::from_millis(8_000),
            plan_deadline: Duration::from_millis(45_000),
            fetch_concurrency: 8,
            cache_ttl: Duration::from_secs(600),
            layer_cache_ttl: Duration::from_secs(3600),
            cache_max_entries: 4096,
            cache_grid_deg: 0.25,
            cache_time_bucket_min: 60,
            avoidance_offset_nm: voyage_core::adjust::DEFAULT_OFFSET_NM,
            max_offset_nm: voyage_core::adjust::DEFAULT_MAX_OFFSET_NM,
            offset_side: SidePolicy::LeastHazard,
            danger_ratio: DEFAULT_DANGER_RATIO,
        }
    }
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_env("VOYAGE_PORT").unwrap_or(defaults.server_port),
            weather_provider: parse_env("VOYAGE_WEATHER_PROVIDER")
                .unwrap_or(defaults.weather_provider),
            marine_url: env::var("VOYAGE_MARINE_URL").unwrap_or(defaults.marine_url),
            forecast_url: env::var("VOYAGE_FORECAST_URL").unwrap_or(defaults.forecast_url),
            fetch_timeout: parse_env("VOYAGE_FETCH_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.fetch_timeout),
            plan_deadline: parse_env("VOYAGE_PLAN_DEADLINE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.plan_deadline),
            fetch_concurrency: parse_env::<usize>("VOYAGE_FETCH_CONCURRENCY")
                .unwrap_or(defaults.fetch_concurrency)
                .clamp(1, 32),
            cache_ttl: parse_env("VOYAGE_CACHE_TTL_S")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            layer_cache_ttl: parse_env("VOYAGE_LAYER_CACHE_TTL_S")
                .map(Duration::from_secs)
                .unwrap_or(defaults.layer_cache_ttl),
            cache_max_entries: parse_env::<usize>("VOYAGE_CACHE_MAX_ENTRIES")
                .unwrap_or(defaults.cache_max_entries)
                .max(1),
            cache_grid_deg: parse_env::<f64>("VOYAGE_CACHE_GRID_DEG")
                .filter(|v| v.is_finite() && *v > 0.0)
                .unwrap_or(defaults.cache_grid_deg),
            cache_time_bucket_min: parse_env::<i64>("VOYAGE_CACHE_TIME_BUCKET_MIN")
                .filter(|v| *v > 0)
                .unwrap_or(defaults.cache_time_bucket_min),
            avoidance_offset_nm: parse_env::<f64>("VOYAGE_AVOIDANCE_OFFSET_NM")
                .filter(|v| v.is_finite() && *v >= 0.0)
                .unwrap_or(defaults.avoidance_offset_nm),
            max_offset_nm: parse_env::<f64>("VOYAGE_MAX_OFFSET_NM")
                .filter(|v| v.is_finite() && *v >= 0.0)
                .unwrap_or(defaults.max_offset_nm),
            offset_side: parse_env("VOYAGE_OFFSET_SIDE").unwrap_or(defaults.offset_side),
            danger_ratio: parse_env::<f64>("VOYAGE_DANGER_RATIO")
                .filter(|v| v.is_finite() && *v >= 1.0)
                .unwrap_or(defaults.danger_ratio),
        }
        .sanitized()
    }

    /// Clamp values that would otherwise overflow deadlines or cache keys.
    pub fn sanitized(mut self) -> Self {
        self.fetch_timeout = self.fetch_timeout.min(MAX_FETCH_TIMEOUT);
        self.plan_deadline = self.plan_deadline.min(MAX_PLAN_DEADLINE);
        self.fetch_concurrency = self.fetch_concurrency.clamp(1, 32);
        self.cache_time_bucket_min = self.cache_time_bucket_min.clamp(1, MAX_BUCKET_MINUTES);
        if !(self.cache_grid_deg.is_finite() && self.cache_grid_deg > 0.0) {
            self.cache_grid_deg = Self::default().cache_grid_deg;
        }
        self.cache_grid_deg = self.cache_grid_deg.min(MAX_GRID_DEG);
        self
    }

    pub fn adjustment(&self) -> AdjustmentConfig {
        AdjustmentConfig {
            offset_nm: self.avoidance_offset_nm,
            max_offset_nm: self.max_offset_nm,
            side_policy: self.offset_side,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_parse() {
        assert_eq!("open-meteo".parse(), Ok(WeatherProvider::OpenMeteo));
        assert_eq!("Synthetic".parse(), Ok(WeatherProvider::Synthetic));
        assert!("noaa".parse::<WeatherProvider>().is_err());
    }

    #[test]
    fn adjustment_follows_config() {
        let config = Config {
            avoidance_offset_nm: 60.0,
            max_offset_nm: 80.0,
            ..Config::default()
        };
        let adjustment = config.adjustment();
        assert_eq!(adjustment.offset_nm, 60.0);
        assert_eq!(adjustment.max_offset_nm, 80.0);
        assert_eq!(adjustment.side_policy, SidePolicy::LeastHazard);
    }

    #[test]
    fn extreme_values_are_clamped() {
        let config = Config {
            plan_deadline: Duration::from_millis(u64::MAX),
            fetch_timeout: Duration::from_millis(u64::MAX),
            fetch_concurrency: 0,
            cache_time_bucket_min: i64::MAX,
            cache_grid_deg: f64::NAN,
            ..Config::default()
        }
        .sanitized();
        assert_eq!(config.plan_deadline, MAX_PLAN_DEADLINE);
        assert_eq!(config.fetch_timeout, MAX_FETCH_TIMEOUT);
        assert_eq!(config.fetch_concurrency, 1);
        assert_eq!(config.cache_time_bucket_min, MAX_BUCKET_MINUTES);
        assert_eq!(config.cache_grid_deg, 0.25);

        let sane = Config::default().sanitized();
        assert_eq!(sane.plan_deadline, Config::default().plan_deadline);
    }
}
