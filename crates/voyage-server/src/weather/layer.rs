//! Gridded surface-current layers over a bounding box, for map overlays.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use voyage_core::{Coordinate, PlanError};

use super::{with_timeout, WeatherAggregator};
use crate::cache::{CacheGrid, WeatherCache};

/// Upper bound on samples in one layer.
pub const MAX_LAYER_POINTS: usize = 5_000;
/// Layer samples change slowly, so their keys use a 3-hour bucket.
pub const LAYER_BUCKET_MINUTES: i64 = 180;
const LAYER_CONCURRENCY: usize = 16;
const KNOTS_TO_MS: f64 = 1.0 / 1.94384;

/// `[west, south, east, north]` in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Bbox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl From<[f64; 4]> for Bbox {
    fn from([west, south, east, north]: [f64; 4]) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }
}

impl From<Bbox> for [f64; 4] {
    fn from(bbox: Bbox) -> Self {
        [bbox.west, bbox.south, bbox.east, bbox.north]
    }
}

impl Bbox {
    pub fn validate(&self) -> Result<(), PlanError> {
        let lon_ok = |v: f64| v.is_finite() && (-180.0..=180.0).contains(&v);
        let lat_ok = |v: f64| v.is_finite() && (-90.0..=90.0).contains(&v);
        if !lon_ok(self.west) || !lon_ok(self.east) {
            return Err(PlanError::InvalidRequest(
                "invalid longitude range in bbox".to_string(),
            ));
        }
        if !lat_ok(self.south) || !lat_ok(self.north) {
            return Err(PlanError::InvalidRequest(
                "invalid latitude range in bbox".to_string(),
            ));
        }
        if self.west >= self.east || self.south >= self.north {
            return Err(PlanError::InvalidRequest(
                "invalid bbox: west must be < east and south must be < north".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerResolution {
    Low,
    #[default]
    Medium,
    High,
}

impl LayerResolution {
    pub fn degrees(self) -> f64 {
        match self {
            LayerResolution::Low => 5.0,
            LayerResolution::Medium => 2.0,
            LayerResolution::High => 1.0,
        }
    }
}

/// Overlay kinds a client may ask for. Only currents are gridded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerType {
    Wind,
    Waves,
    Currents,
    Temperature,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerPoint {
    pub lat: f64,
    pub lon: f64,
    /// Eastward component, m/s
    pub u: f64,
    /// Northward component, m/s
    pub v: f64,
    /// Knots
    pub speed: f64,
    /// Degrees the current flows towards
    pub direction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherLayer {
    pub layer_type: LayerType,
    pub bbox: Bbox,
    pub timestamp: DateTime<Utc>,
    pub resolution: LayerResolution,
    pub resolution_deg: f64,
    pub point_count: usize,
    pub cache_hits: usize,
    pub source: String,
    pub points: Vec<LayerPoint>,
}

/// Inverse of [`super::current_from_components`].
pub fn components_from_current(speed_kn: f64, direction_deg: f64) -> (f64, f64) {
    let speed_ms = speed_kn * KNOTS_TO_MS;
    let radians = direction_deg.to_radians();
    (speed_ms * radians.sin(), speed_ms * radians.cos())
}

/// Grid nodes stepping from the south-west corner, exclusive of the north and
/// east edges.
fn grid_nodes(bbox: &Bbox, step: f64) -> Result<Vec<Coordinate>, PlanError> {
    let rows = ((bbox.north - bbox.south) / step).ceil() as usize;
    let cols = ((bbox.east - bbox.west) / step).ceil() as usize;
    let total = rows.saturating_mul(cols);
    if total > MAX_LAYER_POINTS {
        return Err(PlanError::InvalidRequest(format!(
            "layer would need {total} points; the limit is {MAX_LAYER_POINTS}, use a coarser resolution or a smaller bbox"
        )));
    }
    let mut nodes = Vec::with_capacity(total);
    for row in 0..rows {
        let lat = bbox.south + row as f64 * step;
        for col in 0..cols {
            nodes.push(Coordinate::new(lat, bbox.west + col as f64 * step));
        }
    }
    Ok(nodes)
}

impl WeatherAggregator {
    /// Replace the store backing layer samples.
    pub fn with_layer_cache(mut self, cache: Arc<dyn WeatherCache>) -> Self {
        self.layer_cache = cache;
        self
    }

    /// Sample the current source over a grid. Nodes whose fetch fails are
    /// left out of the layer.
    pub async fn layer(
        &self,
        layer_type: LayerType,
        bbox: Bbox,
        time: DateTime<Utc>,
        resolution: LayerResolution,
    ) -> Result<WeatherLayer, PlanError> {
        if layer_type != LayerType::Currents {
            return Err(PlanError::InvalidRequest(format!(
                "layer type {layer_type:?} is not gridded; only currents are supported"
            )));
        }
        bbox.validate()?;
        let step = resolution.degrees();
        let nodes = grid_nodes(&bbox, step)?;
        let grid = CacheGrid::new(step, LAYER_BUCKET_MINUTES);
        let source = self.currents.name().to_string();

        let samples: Vec<(Option<LayerPoint>, bool)> = stream::iter(nodes)
            .map(|at| self.sample_node(&grid, &source, at, time))
            .buffered(LAYER_CONCURRENCY)
            .collect()
            .await;

        let cache_hits = samples.iter().filter(|(_, hit)| *hit).count();
        let points: Vec<LayerPoint> = samples.into_iter().filter_map(|(point, _)| point).collect();
        tracing::info!(
            points = points.len(),
            cache_hits,
            resolution_deg = step,
            "Current layer sampled"
        );

        Ok(WeatherLayer {
            layer_type,
            bbox,
            timestamp: time,
            resolution,
            resolution_deg: step,
            point_count: points.len(),
            cache_hits,
            source,
            points,
        })
    }

    /// One layer node and whether it came from the layer cache.
    async fn sample_node(
        &self,
        grid: &CacheGrid,
        source: &str,
        at: Coordinate,
        time: DateTime<Utc>,
    ) -> (Option<LayerPoint>, bool) {
        let key = grid.key(at.lat, at.lon, time);
        let cached = self.layer_cache.get(&key).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Layer cache lookup failed; treating as miss");
            None
        });
        let hit = cached.is_some();
        let snapshot = match cached {
            Some(snapshot) => snapshot,
            None => match with_timeout(source, self.fetch_timeout, self.currents.fetch(at, time)).await {
                Ok(snapshot) => {
                    if let Err(err) = self.layer_cache.insert(key, snapshot.clone()) {
                        tracing::warn!(error = %err, "Layer cache insert failed");
                    }
                    snapshot
                }
                Err(err) => {
                    tracing::warn!(lat = at.lat, lon = at.lon, error = %err, "Skipping layer node");
                    return (None, false);
                }
            },
        };

        let point = snapshot
            .current_speed
            .zip(snapshot.current_direction)
            .map(|(speed, direction)| {
                let (u, v) = snapshot
                    .current_u
                    .zip(snapshot.current_v)
                    .unwrap_or_else(|| components_from_current(speed, direction));
                LayerPoint {
                    lat: at.lat,
                    lon: at.lon,
                    u,
                    v,
                    speed,
                    direction,
                }
            });
        (point, hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::current_from_components;

    #[test]
    fn components_invert_speed_and_direction() {
        let (u, v) = components_from_current(1.94384, 90.0);
        assert!((u - 1.0).abs() < 1e-9);
        assert!(v.abs() < 1e-9);

        let (u, v) = components_from_current(3.0, 225.0);
        let (speed, direction) = current_from_components(u, v);
        assert!((speed - 3.0).abs() < 1e-9);
        assert!((direction - 225.0).abs() < 1e-9);
    }

    #[test]
    fn grid_excludes_north_and_east_edges() {
        let bbox = Bbox::from([-10.0, 0.0, 0.0, 4.0]);
        let nodes = grid_nodes(&bbox, 2.0).unwrap();
        assert_eq!(nodes.len(), 10);
        assert_eq!(nodes[0], Coordinate::new(0.0, -10.0));
        assert_eq!(nodes[9], Coordinate::new(2.0, -2.0));
        assert!(nodes.iter().all(|n| n.lat < 4.0 && n.lon < 0.0));
    }

    #[test]
    fn whole_globe_at_high_resolution_is_refused() {
        let bbox = Bbox::from([-180.0, -90.0, 180.0, 90.0]);
        assert!(matches!(
            grid_nodes(&bbox, LayerResolution::High.degrees()),
            Err(PlanError::InvalidRequest(_))
        ));
        assert_eq!(
            grid_nodes(&bbox, LayerResolution::Low.degrees()).unwrap().len(),
            72 * 36
        );
    }

    #[test]
    fn inverted_bbox_is_rejected() {
        assert!(Bbox::from([10.0, 0.0, -10.0, 5.0]).validate().is_err());
        assert!(Bbox::from([-10.0, 5.0, 10.0, 0.0]).validate().is_err());
        assert!(Bbox::from([-190.0, 0.0, 10.0, 5.0]).validate().is_err());
        assert!(Bbox::from([-10.0, 0.0, 10.0, 5.0]).validate().is_ok());
    }

    #[test]
    fn bbox_reads_from_an_array() {
        let bbox: Bbox = serde_json::from_value(serde_json::json!([-20.0, 10.0, -5.0, 30.0])).unwrap();
        assert_eq!(bbox.west, -20.0);
        assert_eq!(bbox.north, 30.0);
        assert_eq!(serde_json::to_value(bbox).unwrap(), serde_json::json!([-20.0, 10.0, -5.0, 30.0]));
    }
}
