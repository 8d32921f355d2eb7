//! Offline wind/wave generator with climate-zone patterns.
//!
//! Values are drawn from an RNG seeded by the grid cell and hour, so the
//! same position and time always yield the same snapshot.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Timelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

use voyage_core::{Coordinate, WeatherError, WeatherSnapshot};

use super::WindWaveSource;

const SOURCE_NAME: &str = "synthetic";
const CELL_DEG: f64 = 0.25;

#[derive(Debug, Clone)]
pub struct SyntheticWindWaveSource {
    seed: u64,
}

impl Default for SyntheticWindWaveSource {
    fn default() -> Self {
        Self::new(42)
    }
}

fn mix(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

fn base_wind_kn(rng: &mut StdRng, abs_lat: f64) -> f64 {
    if abs_lat < 5.0 {
        rng.random_range(3.0..8.0)
    } else if abs_lat < 30.0 {
        rng.random_range(10.0..20.0)
    } else if abs_lat < 40.0 {
        rng.random_range(8.0..15.0)
    } else if abs_lat < 60.0 {
        rng.random_range(15.0..25.0)
    } else {
        rng.random_range(20.0..35.0)
    }
}

fn base_wave_m(rng: &mut StdRng, abs_lat: f64) -> f64 {
    if abs_lat < 20.0 {
        rng.random_range(1.0..2.5)
    } else if abs_lat < 40.0 {
        rng.random_range(1.5..3.5)
    } else {
        rng.random_range(2.5..5.0)
    }
}

fn base_temperature_c(rng: &mut StdRng, lat: f64, time: DateTime<Utc>) -> f64 {
    let abs_lat = lat.abs();
    let base = if abs_lat < 23.5 {
        rng.random_range(25.0..30.0)
    } else if abs_lat < 40.0 {
        rng.random_range(15.0..25.0)
    } else if abs_lat < 60.0 {
        rng.random_range(5.0..15.0)
    } else {
        rng.random_range(-10.0..5.0)
    };
    let seasonal = ((time.ordinal() as f64 - 80.0) * 2.0 * PI / 365.0).sin() * 10.0;
    if lat >= 0.0 {
        base + seasonal
    } else {
        base - seasonal
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

impl SyntheticWindWaveSource {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    fn rng_for(&self, lat_cell: i64, lon_cell: i64, hours: i64) -> StdRng {
        let seed = mix(
            self.seed
                ^ mix(lat_cell as u64)
                ^ mix((lon_cell as u64).rotate_left(21))
                ^ mix((hours as u64).rotate_left(42)),
        );
        StdRng::seed_from_u64(seed)
    }

    pub fn snapshot(&self, at: Coordinate, time: DateTime<Utc>) -> WeatherSnapshot {
        let hours = time.timestamp().div_euclid(3600);
        let lat_cell = (at.lat / CELL_DEG).round() as i64;
        let lon_cell = (at.lon / CELL_DEG).round() as i64;
        let mut rng = self.rng_for(lat_cell, lon_cell, hours);
        let at = Coordinate::new(lat_cell as f64 * CELL_DEG, lon_cell as f64 * CELL_DEG);
        let abs_lat = at.lat.abs();
        // Slow synoptic cycles keyed on absolute hours
        let h = hours as f64;

        let wind_factor = 1.0 + 0.3 * (h * 0.1).sin() + 0.2 * (h * 0.05).sin();
        let wave_factor = 1.0 + 0.25 * (h * 0.08).sin() + 0.15 * (h * 0.04).sin();

        let wind_speed =
            (base_wind_kn(&mut rng, abs_lat) * wind_factor + rng.random_range(-2.0..2.0)).max(0.0);
        let wind_direction = ((at.lon + 180.0) + 30.0 * (h * 0.15).sin()).rem_euclid(360.0);
        let wind_gust = wind_speed * rng.random_range(1.2..1.5);

        let wave_height =
            (base_wave_m(&mut rng, abs_lat) * wave_factor + rng.random_range(-0.5..0.5)).max(0.1);
        let wave_direction = (wind_direction + rng.random_range(-30.0..30.0)).rem_euclid(360.0);
        let wave_period = 4.0 + wave_height * 2.0 + rng.random_range(-1.0..1.0);

        let diurnal = 3.0 * ((time.hour() as f64 - 6.0) * PI / 12.0).sin();
        let temperature =
            base_temperature_c(&mut rng, at.lat, time) + diurnal + rng.random_range(-1.0..1.0);
        let pressure = 1013.25 + 10.0 * (h * 0.05).sin() + rng.random_range(-2.0..2.0);
        let precipitation = if rng.random_bool(0.15) {
            Some(round_to(rng.random_range(0.1..5.0), 1))
        } else {
            None
        };

        WeatherSnapshot {
            wind_speed: Some(round_to(wind_speed, 1)),
            wind_direction: Some(round_to(wind_direction, 1) % 360.0),
            wind_gust: Some(round_to(wind_gust, 1)),
            wave_height: Some(round_to(wave_height, 2)),
            wave_direction: Some(round_to(wave_direction, 1) % 360.0),
            wave_period: Some(round_to(wave_period, 1)),
            temperature: Some(round_to(temperature, 1)),
            pressure: Some(round_to(pressure, 2)),
            precipitation,
            ..Default::default()
        }
    }
}

#[async_trait]
impl WindWaveSource for SyntheticWindWaveSource {
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

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn same_cell_and_hour_give_the_same_snapshot() {
        let source = SyntheticWindWaveSource::default();
        let a = source.snapshot(Coordinate::new(35.0, -40.0), noon());
        let b = source.snapshot(
            Coordinate::new(35.01, -40.01),
            noon() + chrono::Duration::minutes(20),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn readings_stay_in_plausible_ranges() {
        let source = SyntheticWindWaveSource::new(7);
        for lat in [-65.0, -35.0, 0.0, 15.0, 45.0, 70.0] {
            for hour in 0..48 {
                let time = noon() + chrono::Duration::hours(hour);
                let s = source.snapshot(Coordinate::new(lat, 120.0), time);
                let wind = s.wind_speed.unwrap();
                let wave = s.wave_height.unwrap();
                assert!((0.0..80.0).contains(&wind), "wind {wind} at {lat}");
                assert!((0.1..12.0).contains(&wave), "wave {wave} at {lat}");
                assert!((0.0..360.0).contains(&s.wind_direction.unwrap()));
                assert!(s.wind_gust.unwrap() >= wind);
                assert!(s.current_speed.is_none());
            }
        }
    }

    #[test]
    fn equatorial_winds_are_lighter_than_polar() {
        let source = SyntheticWindWaveSource::default();
        let mean = |lat: f64| {
            (0..72)
                .map(|h| {
                    source
                        .snapshot(Coordinate::new(lat, 0.0), noon() + chrono::Duration::hours(h))
                        .wind_speed
                        .unwrap()
                })
                .sum::<f64>()
                / 72.0
        };
        assert!(mean(1.0) < mean(65.0));
    }
}
