//! Open-Meteo marine and forecast APIs as a wind/wave source.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use voyage_core::{Coordinate, WeatherError, WeatherSnapshot};

use super::forecast::HourlySeries;
use super::WindWaveSource;

const SOURCE_NAME: &str = "open-meteo";
const MARINE_PARAMS: &str = "wave_height,wave_direction,wave_period";
const FORECAST_PARAMS: &str =
    "wind_speed_10m,wind_direction_10m,wind_gusts_10m,temperature_2m,surface_pressure,precipitation";

#[derive(Debug, Deserialize)]
struct HourlyResponse<T> {
    hourly: Option<T>,
}

#[derive(Debug, Deserialize)]
struct MarineHourly {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    wave_height: Vec<Option<f64>>,
    #[serde(default)]
    wave_direction: Vec<Option<f64>>,
    #[serde(default)]
    wave_period: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ForecastHourly {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    wind_direction_10m: Vec<Option<f64>>,
    #[serde(default)]
    wind_gusts_10m: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    surface_pressure: Vec<Option<f64>>,
    #[serde(default)]
    precipitation: Vec<Option<f64>>,
}

#[derive(Debug, Clone)]
pub struct OpenMeteoSource {
    client: Client,
    marine_url: String,
    forecast_url: String,
}

impl OpenMeteoSource {
    pub fn new(
        marine_url: impl Into<String>,
        forecast_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("voyage-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| WeatherError::upstream(SOURCE_NAME, err))?;
        Ok(Self {
            client,
            marine_url: marine_url.into(),
            forecast_url: forecast_url.into(),
        })
    }

    /// Query window: the UTC day containing `time` and the day after, so
    /// late-evening lookups still have a bracketing step.
    fn window(time: DateTime<Utc>) -> (String, String) {
        let day = time.date_naive();
        let next = day.succ_opt().unwrap_or(day);
        (
            day.format("%Y-%m-%d").to_string(),
            next.format("%Y-%m-%d").to_string(),
        )
    }

    async fn query<T>(
        &self,
        url: &str,
        at: Coordinate,
        time: DateTime<Utc>,
        hourly: &str,
        extra: &[(&str, &str)],
    ) -> Result<T, WeatherError>
    where
        T: DeserializeOwned,
    {
        let (start_date, end_date) = Self::window(time);
        let mut params: Vec<(&str, String)> = vec![
            ("latitude", format!("{:.4}", at.lat)),
            ("longitude", format!("{:.4}", at.lon)),
            ("hourly", hourly.to_string()),
            ("start_date", start_date),
            ("end_date", end_date),
            ("timezone", "UTC".to_string()),
        ];
        params.extend(extra.iter().map(|(k, v)| (*k, v.to_string())));

        let response = self
            .client
            .get(url)
            .query(&params)
            .send()
            .await
            .map_err(|err| WeatherError::upstream(SOURCE_NAME, err))?;

        if !response.status().is_success() {
            return Err(WeatherError::upstream(
                SOURCE_NAME,
                format!("HTTP {} from {url}", response.status()),
            ));
        }

        let payload: HourlyResponse<T> = response
            .json()
            .await
            .map_err(|err| WeatherError::decode(SOURCE_NAME, err))?;
        payload
            .hourly
            .ok_or_else(|| WeatherError::decode(SOURCE_NAME, "response missing hourly block"))
    }

    async fn fetch_marine(
        &self,
        at: Coordinate,
        time: DateTime<Utc>,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let hourly: MarineHourly = self
            .query(&self.marine_url, at, time, MARINE_PARAMS, &[])
            .await?;
        Ok(marine_snapshot(&hourly, time))
    }

    async fn fetch_forecast(
        &self,
        at: Coordinate,
        time: DateTime<Utc>,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let hourly: ForecastHourly = self
            .query(
                &self.forecast_url,
                at,
                time,
                FORECAST_PARAMS,
                &[("wind_speed_unit", "kn")],
            )
            .await?;
        Ok(forecast_snapshot(&hourly, time))
    }
}

fn marine_snapshot(hourly: &MarineHourly, time: DateTime<Utc>) -> WeatherSnapshot {
    WeatherSnapshot {
        wave_height: HourlySeries::from_raw(&hourly.time, &hourly.wave_height).value_at(time),
        wave_direction: HourlySeries::from_raw(&hourly.time, &hourly.wave_direction).angle_at(time),
        wave_period: HourlySeries::from_raw(&hourly.time, &hourly.wave_period).value_at(time),
        ..Default::default()
    }
}

fn forecast_snapshot(hourly: &ForecastHourly, time: DateTime<Utc>) -> WeatherSnapshot {
    let series = |values: &[Option<f64>]| HourlySeries::from_raw(&hourly.time, values);
    WeatherSnapshot {
        wind_speed: series(&hourly.wind_speed_10m).value_at(time),
        wind_direction: series(&hourly.wind_direction_10m).angle_at(time),
        wind_gust: series(&hourly.wind_gusts_10m).value_at(time),
        temperature: series(&hourly.temperature_2m).value_at(time),
        pressure: series(&hourly.surface_pressure).value_at(time),
        precipitation: series(&hourly.precipitation).value_at(time),
        ..Default::default()
    }
}

#[async_trait]
impl WindWaveSource for OpenMeteoSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    /// Marine and atmospheric calls run together; one failing keeps the
    /// other's fields.
    async fn fetch(
        &self,
        at: Coordinate,
        time: DateTime<Utc>,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let (marine, forecast) =
            tokio::join!(self.fetch_marine(at, time), self.fetch_forecast(at, time));
        match (marine, forecast) {
            (Ok(marine), Ok(forecast)) => Ok(forecast.merge(marine)),
            (Ok(marine), Err(err)) => {
                tracing::warn!(error = %err, "Atmospheric forecast unavailable; keeping wave data");
                Ok(marine)
            }
            (Err(err), Ok(forecast)) => {
                // Inland points have no marine data.
                tracing::warn!(error = %err, "Marine forecast unavailable; keeping wind data");
                Ok(forecast)
            }
            (Err(marine_err), Err(forecast_err)) => Err(WeatherError::upstream(
                SOURCE_NAME,
                format!("marine: {marine_err}; forecast: {forecast_err}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn decodes_and_interpolates_marine_payload() {
        let payload = serde_json::json!({
            "latitude": 1.25,
            "longitude": 103.75,
            "hourly": {
                "time": ["2024-01-01T00:00", "2024-01-01T01:00"],
                "wave_height": [1.0, 2.0],
                "wave_direction": [350.0, 10.0],
                "wave_period": [null, 7.0]
            }
        });
        let response: HourlyResponse<MarineHourly> = serde_json::from_value(payload).unwrap();
        let time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 30, 0).unwrap();
        let snapshot = marine_snapshot(&response.hourly.unwrap(), time);
        assert_eq!(snapshot.wave_height, Some(1.5));
        assert_eq!(snapshot.wave_period, Some(7.0));
        let direction = snapshot.wave_direction.unwrap();
        assert!(direction < 1e-9 || direction > 360.0 - 1e-9);
        assert!(snapshot.wind_speed.is_none());
    }

    #[test]
    fn decodes_forecast_payload() {
        let payload = serde_json::json!({
            "hourly": {
                "time": ["2024-01-01T00:00", "2024-01-01T01:00"],
                "wind_speed_10m": [20.0, 30.0],
                "wind_direction_10m": [90.0, 90.0],
                "temperature_2m": [27.0, 28.0]
            }
        });
        let response: HourlyResponse<ForecastHourly> = serde_json::from_value(payload).unwrap();
        let time = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
        let snapshot = forecast_snapshot(&response.hourly.unwrap(), time);
        assert_eq!(snapshot.wind_speed, Some(30.0));
        assert_eq!(snapshot.wind_direction, Some(90.0));
        assert_eq!(snapshot.temperature, Some(28.0));
        assert_eq!(snapshot.pressure, None);
    }

    #[test]
    fn window_spans_two_days() {
        let time = Utc.with_ymd_and_hms(2024, 12, 31, 23, 0, 0).unwrap();
        assert_eq!(
            OpenMeteoSource::window(time),
            ("2024-12-31".to_string(), "2025-01-01".to_string())
        );
    }
}
