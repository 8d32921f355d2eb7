//! Time interpolation over hourly forecast series.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// A forecast variable sampled at (possibly sparse) instants.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HourlySeries {
    samples: Vec<(DateTime<Utc>, f64)>,
}

/// Parse the `YYYY-MM-DDTHH:MM` timestamps used by forecast APIs (UTC).
pub fn parse_forecast_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl HourlySeries {
    /// Pair timestamps with values, dropping unparsable times and nulls.
    pub fn from_raw(times: &[String], values: &[Option<f64>]) -> Self {
        let mut samples: Vec<(DateTime<Utc>, f64)> = times
            .iter()
            .zip(values)
            .filter_map(|(raw, value)| {
                let value = (*value).filter(|v| v.is_finite())?;
                Some((parse_forecast_time(raw)?, value))
            })
            .collect();
        samples.sort_by_key(|(time, _)| *time);
        Self { samples }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Bracketing samples and the fraction of the way from the first to the
    /// second. Outside the series the nearest sample is returned with fraction 0.
    fn bracket(&self, time: DateTime<Utc>) -> Option<((f64, f64), f64)> {
        let (first_time, first_value) = *self.samples.first()?;
        let (last_time, last_value) = *self.samples.last()?;
        if time <= first_time {
            return Some(((first_value, first_value), 0.0));
        }
        if time >= last_time {
            return Some(((last_value, last_value), 0.0));
        }

        let upper = self.samples.partition_point(|(t, _)| *t <= time);
        let (t0, v0) = self.samples[upper - 1];
        let (t1, v1) = self.samples[upper];
        let span = (t1 - t0).num_milliseconds() as f64;
        if span <= 0.0 {
            return Some(((v0, v0), 0.0));
        }
        let fraction = (time - t0).num_milliseconds() as f64 / span;
        Some(((v0, v1), fraction.clamp(0.0, 1.0)))
    }

    /// Linear interpolation between bracketing steps.
    pub fn value_at(&self, time: DateTime<Utc>) -> Option<f64> {
        let ((a, b), f) = self.bracket(time)?;
        Some(a + (b - a) * f)
    }

    /// Interpolation of a direction in degrees along the shorter arc.
    pub fn angle_at(&self, time: DateTime<Utc>) -> Option<f64> {
        let ((a, b), f) = self.bracket(time)?;
        let delta = (b - a + 540.0).rem_euclid(360.0) - 180.0;
        Some((a + delta * f).rem_euclid(360.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
    }

    fn series(values: &[Option<f64>]) -> HourlySeries {
        let times: Vec<String> = (0..values.len())
            .map(|h| format!("2024-01-01T{h:02}:00"))
            .collect();
        HourlySeries::from_raw(&times, values)
    }

    #[test]
    fn parses_forecast_timestamps() {
        assert_eq!(parse_forecast_time("2024-01-01T06:00"), Some(t(6, 0)));
        assert_eq!(parse_forecast_time("2024-01-01T06:30:00Z"), Some(t(6, 30)));
        assert_eq!(parse_forecast_time("yesterday"), None);
    }

    #[test]
    fn linear_between_steps_and_nearest_outside() {
        let s = series(&[Some(10.0), Some(20.0), Some(40.0)]);
        assert_eq!(s.value_at(t(0, 30)), Some(15.0));
        assert_eq!(s.value_at(t(1, 0)), Some(20.0));
        assert_eq!(s.value_at(t(1, 15)), Some(25.0));
        assert_eq!(s.value_at(t(5, 0)), Some(40.0));
    }

    #[test]
    fn nulls_are_skipped() {
        let s = series(&[Some(10.0), None, Some(30.0)]);
        assert_eq!(s.len(), 2);
        assert_eq!(s.value_at(t(1, 0)), Some(20.0));
        assert!(series(&[None, None]).value_at(t(0, 0)).is_none());
    }

    #[test]
    fn angles_take_the_short_way_round() {
        let s = series(&[Some(350.0), Some(10.0)]);
        let mid = s.angle_at(t(0, 30)).unwrap();
        assert!(mid.abs() < 1e-9 || (mid - 360.0).abs() < 1e-9, "got {mid}");
        let quarter = s.angle_at(t(0, 15)).unwrap();
        assert!((quarter - 355.0).abs() < 1e-9);
    }
}
