//! Application state: configuration, weather aggregation and the planner.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;

use crate::cache::{CacheGrid, TtlCache};
use crate::config::{Config, WeatherProvider};
use crate::route_planner::{PlannerSettings, RoutePlanner};
use crate::weather::{
    ClimatologyCurrentSource, OceanCurrentSource, OpenMeteoSource, SyntheticWindWaveSource,
    WeatherAggregator, WindWaveSource,
};

pub struct AppState {
    config: Config,
    planner: RoutePlanner,
    plans_served: AtomicU64,
}

impl AppState {
    /// Build sources, cache and planner from configuration.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let wind_wave: Arc<dyn WindWaveSource> = match config.weather_provider {
            WeatherProvider::OpenMeteo => Arc::new(
                OpenMeteoSource::new(
                    config.marine_url.clone(),
                    config.forecast_url.clone(),
                    config.fetch_timeout,
                )
                .context("building Open-Meteo client")?,
            ),
            WeatherProvider::Synthetic => Arc::new(SyntheticWindWaveSource::default()),
        };
        let currents: Arc<dyn OceanCurrentSource> = Arc::new(ClimatologyCurrentSource::new());
        tracing::info!(
            wind_wave = wind_wave.name(),
            currents = currents.name(),
            "Weather sources configured"
        );
        Ok(Self::with_sources(config, wind_wave, currents))
    }

    /// State over explicit sources; used by tests and embedders.
    pub fn with_sources(
        config: Config,
        wind_wave: Arc<dyn WindWaveSource>,
        currents: Arc<dyn OceanCurrentSource>,
    ) -> Self {
        let cache = Arc::new(TtlCache::new(config.cache_ttl, config.cache_max_entries));
        let grid = CacheGrid::new(config.cache_grid_deg, config.cache_time_bucket_min);
        let layer_cache = Arc::new(TtlCache::new(config.layer_cache_ttl, config.cache_max_entries));
        let weather = Arc::new(
            WeatherAggregator::new(wind_wave, currents, cache, grid, config.fetch_timeout)
                .with_layer_cache(layer_cache),
        );
        let planner = RoutePlanner::new(weather, PlannerSettings::from_config(&config));
        Self {
            config,
            planner,
            plans_served: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn planner(&self) -> &RoutePlanner {
        &self.planner
    }

    pub fn weather(&self) -> &Arc<WeatherAggregator> {
        self.planner.weather()
    }

    /// Record a completed plan and return the running total.
    pub fn record_plan(&self) -> u64 {
        self.plans_served.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn plans_served(&self) -> u64 {
        self.plans_served.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_provider_builds_without_network() {
        let config = Config {
            weather_provider: WeatherProvider::Synthetic,
            ..Config::default()
        };
        let state = AppState::from_config(config).unwrap();
        let (wind_wave, currents) = state.weather().source_names();
        assert_eq!(wind_wave, "synthetic");
        assert_eq!(currents, "ocean-currents");
        assert_eq!(state.plans_served(), 0);
        assert_eq!(state.record_plan(), 1);
    }
}
