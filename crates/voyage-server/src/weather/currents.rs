//! Climatological surface-current model.
//!
//! Major current systems are approximated by basin and latitude band, then
//! modulated by tidal and eddy terms. Positions are snapped to a 0.25° grid
//! (nearest neighbour) so the field is piecewise constant like a gridded
//! ocean model product.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Timelike, Utc};
use std::f64::consts::PI;

use voyage_core::{Coordinate, WeatherError, WeatherSnapshot};

use super::{current_from_components, OceanCurrentSource};

const SOURCE_NAME: &str = "ocean-currents";
const GRID_DEG: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Basin {
    Atlantic,
    Pacific,
    Indian,
    Other,
}

fn basin(lon: f64) -> Basin {
    if (-70.0..=20.0).contains(&lon) {
        Basin::Atlantic
    } else if lon >= 120.0 || lon <= -100.0 {
        Basin::Pacific
    } else if (20.0..=120.0).contains(&lon) {
        Basin::Indian
    } else {
        Basin::Other
    }
}

fn snap(value: f64) -> f64 {
    (value / GRID_DEG).round() * GRID_DEG
}

fn between(value: f64, low: f64, high: f64) -> bool {
    (low..=high).contains(&value)
}

fn atlantic(lat: f64, lon: f64) -> (f64, f64) {
    if between(lat, 20.0, 45.0) && between(lon, -80.0, -40.0) {
        // Gulf Stream
        (0.8 + (lat - 20.0) * 0.04, 1.0 + (lat - 20.0) * 0.03)
    } else if between(lat, 45.0, 65.0) && between(lon, -40.0, -10.0) {
        // North Atlantic Drift
        (0.4 + (lat - 45.0) * 0.01, 0.3 + (lat - 45.0) * 0.02)
    } else if between(lat, 20.0, 35.0) && between(lon, -25.0, -10.0) {
        // Canary
        (-0.2, -0.4)
    } else if between(lat, 10.0, 20.0) {
        (-0.5 - (lat - 10.0) * 0.02, 0.0)
    } else if between(lat, 3.0, 10.0) {
        (0.4, 0.0)
    } else if between(lat, -5.0, 3.0) {
        (-0.6, 0.0)
    } else if between(lat, -40.0, -5.0) && between(lon, -50.0, -35.0) {
        // Brazil
        (0.2, -0.6 + (lat + 20.0) * 0.02)
    } else if between(lat, -35.0, -15.0) && between(lon, 5.0, 20.0) {
        // Benguela
        (-0.1, 0.4)
    } else if between(lat, -40.0, -15.0) {
        (-0.3, 0.1)
    } else {
        (0.0, 0.0)
    }
}

fn pacific(lat: f64, lon: f64) -> (f64, f64) {
    if between(lat, 25.0, 45.0) && between(lon, 130.0, 160.0) {
        // Kuroshio
        (0.9 + (lat - 25.0) * 0.03, 1.1 + (lat - 25.0) * 0.02)
    } else if between(lat, 40.0, 55.0) && (lon >= 160.0 || lon <= -140.0) {
        (0.5, 0.2)
    } else if between(lat, 25.0, 45.0) && between(lon, -130.0, -110.0) {
        // California
        (-0.1, -0.5)
    } else if between(lat, 10.0, 20.0) {
        (-0.6, 0.0)
    } else if between(lat, 3.0, 10.0) {
        (0.5, 0.0)
    } else if between(lat, -10.0, 3.0) {
        (-0.7, 0.0)
    } else if between(lat, -40.0, -15.0) && between(lon, 150.0, 160.0) {
        // East Australian
        (0.3, -0.7)
    } else if between(lat, -40.0, -5.0) && between(lon, -90.0, -70.0) {
        // Humboldt
        (-0.2, 0.6 + (lat + 20.0) * 0.02)
    } else {
        (0.0, 0.0)
    }
}

fn indian(lat: f64, lon: f64, month: u32) -> (f64, f64) {
    if between(lat, -40.0, -25.0) && between(lon, 25.0, 40.0) {
        // Agulhas
        (0.4, -1.0)
    } else if between(lat, 0.0, 12.0) && between(lon, 45.0, 55.0) {
        // Somali current reverses with the monsoon
        (0.2, 0.6 * (month as f64 * PI / 6.0).sin())
    } else if between(lat, -15.0, 0.0) {
        (-0.5, 0.0)
    } else if between(lat, 8.0, 15.0) {
        (-0.4, 0.0)
    } else if between(lat, 3.0, 8.0) {
        (0.4, 0.0)
    } else {
        (0.0, 0.0)
    }
}

/// Eastward/northward components in m/s at a grid point.
pub fn model_components(lat: f64, lon: f64, time: DateTime<Utc>) -> (f64, f64) {
    let (mut u, mut v) = match basin(lon) {
        Basin::Atlantic => atlantic(lat, lon),
        Basin::Pacific => pacific(lat, lon),
        Basin::Indian => indian(lat, lon, time.month()),
        Basin::Other => (0.0, 0.0),
    };

    if lat < -45.0 {
        // Antarctic Circumpolar Current
        u = 1.2 + (lat.abs() - 45.0) * 0.05;
        v = -0.1 - (lat.abs() - 45.0) * 0.01;
    } else if lat > 70.0 {
        u = 0.1 * lon.to_radians().sin();
        v = 0.1 * lon.to_radians().cos();
    }

    let tidal = (time.hour() as f64 * PI / 12.0).sin() * 0.15;
    let synoptic = (time.day() as f64 * PI / 15.0).sin() * 0.1;
    u += tidal + synoptic;
    v += tidal * 0.7 + synoptic * 0.5;

    u += (lat * PI / 30.0).sin() * (lon * PI / 45.0).cos() * 0.08;
    v += (lat * PI / 30.0).cos() * (lon * PI / 45.0).sin() * 0.08;
    (u, v)
}

#[derive(Debug, Clone, Default)]
pub struct ClimatologyCurrentSource;

impl ClimatologyCurrentSource {
    pub fn new() -> Self {
        Self
    }

    pub fn snapshot(&self, at: Coordinate, time: DateTime<Utc>) -> WeatherSnapshot {
        let (u, v) = model_components(snap(at.lat), snap(at.lon), time);
        let (speed, direction) = current_from_components(u, v);
        WeatherSnapshot {
            current_speed: Some((speed * 100.0).round() / 100.0),
            current_direction: Some((direction * 10.0).round() / 10.0 % 360.0),
            current_u: Some((u * 1000.0).round() / 1000.0),
            current_v: Some((v * 1000.0).round() / 1000.0),
            ..Default::default()
        }
    }
}

#[async_trait]
impl OceanCurrentSource for ClimatologyCurrentSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch(
        &self,
        at: Coordinate,
        time: DateTime<Utc>,
    ) -> Result<WeatherSnapshot, WeatherError> {
        if !at.lat.is_finite() || !at.lon.is_finite() {
            return Err(WeatherError::upstream(SOURCE_NAME, "non-finite position"));
        }
        Ok(self.snapshot(at, time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn midnight() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
    }

    #[test]
    fn gulf_stream_flows_northeast() {
        let snapshot =
            ClimatologyCurrentSource::new().snapshot(Coordinate::new(35.0, -70.0), midnight());
        let direction = snapshot.current_direction.unwrap();
        assert!(direction > 0.0 && direction < 90.0, "got {direction}");
        assert!(snapshot.current_speed.unwrap() > 2.0);
    }

    #[test]
    fn circumpolar_current_flows_east() {
        let snapshot =
            ClimatologyCurrentSource::new().snapshot(Coordinate::new(-55.0, 0.0), midnight());
        assert!(snapshot.current_u.unwrap() > 1.0);
        let direction = snapshot.current_direction.unwrap();
        assert!(direction > 45.0 && direction < 135.0, "got {direction}");
    }

    #[test]
    fn nearby_points_snap_to_the_same_cell() {
        let source = ClimatologyCurrentSource::new();
        let a = source.snapshot(Coordinate::new(10.01, 60.02), midnight());
        let b = source.snapshot(Coordinate::new(9.99, 59.98), midnight());
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn fetch_is_deterministic() {
        let source = ClimatologyCurrentSource::new();
        let at = Coordinate::new(-30.0, 32.0);
        let first = source.fetch(at, midnight()).await.unwrap();
        let second = source.fetch(at, midnight()).await.unwrap();
        assert_eq!(first, second);
        assert!(first.wind_speed.is_none());
    }
}
