//! Weather aggregation over a wind/wave provider and an ocean-current provider.

pub mod currents;
pub mod forecast;
pub mod layer;
pub mod open_meteo;
pub mod synthetic;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;

use voyage_core::{Coordinate, WeatherError, WeatherSnapshot};

use crate::cache::{CacheGrid, CacheStats, TtlCache, WeatherCache};

pub use currents::ClimatologyCurrentSource;
pub use layer::{Bbox, LayerPoint, LayerResolution, LayerType, WeatherLayer};
pub use open_meteo::OpenMeteoSource;
pub use synthetic::SyntheticWindWaveSource;

/// Point forecast of wind, waves and atmosphere.
#[async_trait]
pub trait WindWaveSource: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch(
        &self,
        at: Coordinate,
        time: DateTime<Utc>,
    ) -> Result<WeatherSnapshot, WeatherError>;
}

/// Point forecast of surface currents.
#[async_trait]
pub trait OceanCurrentSource: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch(
        &self,
        at: Coordinate,
        time: DateTime<Utc>,
    ) -> Result<WeatherSnapshot, WeatherError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SourceStatus {
    Ok,
    Cached,
    Failed { error: String },
}

impl SourceStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, SourceStatus::Failed { .. })
    }
}

/// Merged snapshot plus what each source contributed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotReport {
    pub snapshot: WeatherSnapshot,
    pub wind_wave: SourceStatus,
    pub currents: SourceStatus,
    pub cache_hit: bool,
    /// Names of sources that failed for this lookup
    pub degraded_sources: Vec<String>,
}

pub struct WeatherAggregator {
    wind_wave: Arc<dyn WindWaveSource>,
    currents: Arc<dyn OceanCurrentSource>,
    cache: Arc<dyn WeatherCache>,
    layer_cache: Arc<dyn WeatherCache>,
    grid: CacheGrid,
    fetch_timeout: Duration,
}

async fn with_timeout<F>(
    source_name: &str,
    limit: Duration,
    fetch: F,
) -> Result<WeatherSnapshot, WeatherError>
where
    F: Future<Output = Result<WeatherSnapshot, WeatherError>>,
{
    match tokio::time::timeout(limit, fetch).await {
        Ok(result) => result,
        Err(_) => Err(WeatherError::Timeout {
            source_name: source_name.to_string(),
            after_ms: limit.as_millis() as u64,
        }),
    }
}

fn status_of(source_name: &str, result: &Result<WeatherSnapshot, WeatherError>) -> SourceStatus {
    match result {
        Ok(_) => SourceStatus::Ok,
        Err(err) => {
            tracing::warn!(source = source_name, error = %err, "Weather source degraded");
            SourceStatus::Failed {
                error: err.to_string(),
            }
        }
    }
}

impl WeatherAggregator {
    pub fn new(
        wind_wave: Arc<dyn WindWaveSource>,
        currents: Arc<dyn OceanCurrentSource>,
        cache: Arc<dyn WeatherCache>,
        grid: CacheGrid,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            wind_wave,
            currents,
            cache,
            layer_cache: Arc::new(TtlCache::new(Duration::from_secs(3600), 8192)),
            grid,
            fetch_timeout,
        }
    }

    /// Merged snapshot for a position and time. Never fails; a snapshot with
    /// no fields means neither source answered.
    pub async fn get(&self, at: Coordinate, time: DateTime<Utc>) -> WeatherSnapshot {
        self.get_report(at, time).await.snapshot
    }

    pub async fn get_report(&self, at: Coordinate, time: DateTime<Utc>) -> SnapshotReport {
        let key = self.grid.key(at.lat, at.lon, time);
        match self.cache.get(&key) {
            Ok(Some(snapshot)) => {
                tracing::debug!(lat = at.lat, lon = at.lon, "Weather cache hit");
                return SnapshotReport {
                    snapshot,
                    wind_wave: SourceStatus::Cached,
                    currents: SourceStatus::Cached,
                    cache_hit: true,
                    degraded_sources: Vec::new(),
                };
            }
            Ok(None) => {
                tracing::debug!(lat = at.lat, lon = at.lon, "Weather cache miss");
            }
            Err(err) => {
                tracing::warn!(error = %err, "Weather cache lookup failed; treating as miss");
            }
        }

        let wind_wave_name = self.wind_wave.name().to_string();
        let currents_name = self.currents.name().to_string();
        let (wind_wave, currents) = tokio::join!(
            with_timeout(
                &wind_wave_name,
                self.fetch_timeout,
                self.wind_wave.fetch(at, time)
            ),
            with_timeout(
                &currents_name,
                self.fetch_timeout,
                self.currents.fetch(at, time)
            ),
        );

        let wind_wave_status = status_of(&wind_wave_name, &wind_wave);
        let currents_status = status_of(&currents_name, &currents);

        let mut degraded_sources = Vec::new();
        if wind_wave_status.is_failed() {
            degraded_sources.push(wind_wave_name);
        }
        if currents_status.is_failed() {
            degraded_sources.push(currents_name);
        }

        let complete = degraded_sources.is_empty();
        let snapshot = wind_wave
            .unwrap_or_default()
            .merge(currents.unwrap_or_default());

        if complete {
            if let Err(err) = self.cache.insert(key, snapshot.clone()) {
                tracing::warn!(error = %err, "Weather cache insert failed");
            }
        } else if snapshot.is_empty() {
            tracing::warn!(lat = at.lat, lon = at.lon, "No weather source answered");
        }

        SnapshotReport {
            snapshot,
            wind_wave: wind_wave_status,
            currents: currents_status,
            cache_hit: false,
            degraded_sources,
        }
    }

    /// Reports for many points, in input order, at most `concurrency` at once.
    pub async fn get_batch(
        &self,
        points: &[(Coordinate, DateTime<Utc>)],
        concurrency: usize,
    ) -> Vec<SnapshotReport> {
        stream::iter(points.iter().copied())
            .map(|(at, time)| self.get_report(at, time))
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) -> usize {
        let dropped = self.cache.clear() + self.layer_cache.clear();
        tracing::info!(dropped, "Weather cache cleared");
        dropped
    }

    pub fn source_names(&self) -> (String, String) {
        (
            self.wind_wave.name().to_string(),
            self.currents.name().to_string(),
        )
    }
}

/// Convert eastward/northward components (m/s) into speed (knots) and the
/// direction the current flows towards (degrees).
pub fn current_from_components(u_ms: f64, v_ms: f64) -> (f64, f64) {
    const MS_TO_KNOTS: f64 = 1.94384;
    let speed = u_ms.hypot(v_ms) * MS_TO_KNOTS;
    let direction = (90.0 - v_ms.atan2(u_ms).to_degrees()).rem_euclid(360.0);
    (speed, direction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_convert_to_oceanographic_direction() {
        let (speed, direction) = current_from_components(1.0, 0.0);
        assert!((speed - 1.94384).abs() < 1e-9);
        assert!((direction - 90.0).abs() < 1e-9);

        let (_, north) = current_from_components(0.0, 0.5);
        assert!(north.abs() < 1e-9);

        let (_, south_west) = current_from_components(-1.0, -1.0);
        assert!((south_west - 225.0).abs() < 1e-9);
    }

    #[test]
    fn failed_status_serializes_with_reason() {
        let status = SourceStatus::Failed {
            error: "open-meteo unavailable: HTTP 503".to_string(),
        };
        assert_eq!(
            serde_json::to_value(status).unwrap(),
            serde_json::json!({ "status": "failed", "error": "open-meteo unavailable: HTTP 503" })
        );
    }
}
