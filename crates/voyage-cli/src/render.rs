//! Argument parsing and plain-text route tables.

use std::fmt::Write;

use anyhow::{anyhow, Context, Result};

use voyage_core::{Coordinate, RouteResponse};

/// Parse "LAT,LON" in decimal degrees.
pub fn parse_coordinate(raw: &str) -> Result<Coordinate> {
    let (lat, lon) = raw
        .split_once(',')
        .ok_or_else(|| anyhow!("expected LAT,LON, got {raw:?}"))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .with_context(|| format!("invalid latitude in {raw:?}"))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .with_context(|| format!("invalid longitude in {raw:?}"))?;
    let coordinate = Coordinate::new(lat, lon);
    coordinate.validate("coordinate")?;
    Ok(coordinate)
}

fn format_position(c: &Coordinate) -> String {
    let ns = if c.lat >= 0.0 { 'N' } else { 'S' };
    let ew = if c.lon >= 0.0 { 'E' } else { 'W' };
    format!("{:6.2}{ns} {:7.2}{ew}", c.lat.abs(), c.lon.abs())
}

fn format_optional(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.1} {unit}"))
}

/// Waypoint table followed by metrics and warnings.
pub fn render_route(response: &RouteResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:<17}  {:<17}  {:>9}  {:>9}  {:>7}  FLAGS",
        "#", "POSITION", "ETA (UTC)", "CUM NM", "WIND", "WAVES"
    );
    for waypoint in &response.waypoints {
        let weather = waypoint.weather.as_ref();
        let mut flags = Vec::new();
        if waypoint.is_adjusted {
            flags.push("ADJ".to_string());
        }
        flags.extend(waypoint.warnings.iter().cloned());
        let _ = writeln!(
            out,
            "{:>4}  {:<17}  {:<17}  {:>9.1}  {:>9}  {:>7}  {}",
            waypoint.id,
            format_position(&waypoint.coordinates),
            waypoint.eta.format("%Y-%m-%d %H:%M"),
            waypoint.cumulative_distance,
            format_optional(weather.and_then(|w| w.wind_speed), "kn"),
            format_optional(weather.and_then(|w| w.wave_height), "m"),
            flags.join("; ")
        );
    }

    let m = &response.metrics;
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Distance: {:.1} nm ({:.1} km), direct {:.1} nm",
        m.total_distance_nm, m.total_distance_km, m.direct_distance_nm
    );
    let _ = writeln!(
        out,
        "Duration: {:.1} h at {:.1} kn, arriving {}",
        m.estimated_duration_hours,
        m.average_speed_knots,
        m.arrival_time.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(
        out,
        "Adjusted waypoints: {}  max wind: {}  max waves: {}  max current: {}",
        m.waypoints_adjusted,
        format_optional(m.max_wind_speed, "kn"),
        format_optional(m.max_wave_height, "m"),
        format_optional(m.max_current_speed, "kn"),
    );

    if !response.warnings.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Warnings:");
        for warning in &response.warnings {
            let _ = writeln!(
                out,
                "  [{:<7}] #{:<3} {}",
                warning.severity.as_str(),
                warning.waypoint_id,
                warning.message
            );
        }
    }
    let _ = writeln!(
        out,
        "\n{} in {:.0} ms",
        response.algorithm, response.calculation_time_ms
    );
    out
}
