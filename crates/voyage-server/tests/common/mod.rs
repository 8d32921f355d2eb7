//! Scriptable weather sources shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use voyage_core::{distance_nm, Coordinate, WeatherError, WeatherSnapshot};
use voyage_server::cache::{CacheGrid, TtlCache};
use voyage_server::weather::{OceanCurrentSource, WeatherAggregator, WindWaveSource};

/// A storm cell: wind and waves inside `radius_nm` of `center`.
#[derive(Debug, Clone, Copy)]
pub struct Storm {
    pub center: Coordinate,
    pub radius_nm: f64,
    pub wind_kn: f64,
    pub wave_m: f64,
}

#[derive(Default)]
pub struct MockWindWave {
    pub storms: Vec<Storm>,
    pub fail: bool,
    pub delay: Option<Duration>,
    /// Extra delay per degree west of 180°E, so western points finish last
    pub delay_per_west_deg: Option<Duration>,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockWindWave {
    pub fn calm() -> Self {
        Self::default()
    }

    pub fn with_storm(storm: Storm) -> Self {
        Self {
            storms: vec![storm],
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn slower_westward(per_degree: Duration) -> Self {
        Self {
            delay_per_west_deg: Some(per_degree),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WindWaveSource for MockWindWave {
    fn name(&self) -> &str {
        "mock-wind"
    }

    async fn fetch(
        &self,
        at: Coordinate,
        _time: DateTime<Utc>,
    ) -> Result<WeatherSnapshot, WeatherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(per_degree) = self.delay_per_west_deg {
            tokio::time::sleep(per_degree.mul_f64(180.0 - at.lon)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail {
            return Err(WeatherError::upstream("mock-wind", "HTTP 503"));
        }
        let storm = self
            .storms
            .iter()
            .find(|storm| distance_nm(&storm.center, &at) <= storm.radius_nm);
        let (wind, wave) = storm.map_or((10.0, 1.0), |s| (s.wind_kn, s.wave_m));
        Ok(WeatherSnapshot {
            wind_speed: Some(wind),
            wind_direction: Some(270.0),
            wave_height: Some(wave),
            ..Default::default()
        })
    }
}

#[derive(Default)]
pub struct MockCurrents {
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl MockCurrents {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OceanCurrentSource for MockCurrents {
    fn name(&self) -> &str {
        "mock-currents"
    }

    async fn fetch(
        &self,
        _at: Coordinate,
        _time: DateTime<Utc>,
    ) -> Result<WeatherSnapshot, WeatherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(WeatherError::upstream("mock-currents", "connection refused"));
        }
        Ok(WeatherSnapshot {
            current_speed: Some(0.8),
            current_direction: Some(45.0),
            ..Default::default()
        })
    }
}

pub fn aggregator(
    wind_wave: Arc<MockWindWave>,
    currents: Arc<MockCurrents>,
    ttl: Duration,
) -> WeatherAggregator {
    WeatherAggregator::new(
        wind_wave,
        currents,
        Arc::new(TtlCache::new(ttl, 1024)),
        CacheGrid::new(0.25, 60),
        Duration::from_secs(5),
    )
}
