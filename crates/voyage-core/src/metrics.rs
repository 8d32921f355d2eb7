//! Per-waypoint distance/ETA schedule and whole-route summary statistics.

use chrono::{DateTime, Duration, Utc};

use crate::error::PlanError;
use crate::models::{Coordinate, RouteMetrics, Waypoint};
use crate::spatial::{distance_nm, nm_to_km};

/// Distance and timing for one position along a route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leg {
    pub distance_from_prev: f64,
    pub cumulative_distance: f64,
    pub eta: DateTime<Utc>,
}

fn check_speed(speed_kn: f64) -> Result<(), PlanError> {
    if !speed_kn.is_finite() || speed_kn <= 0.0 {
        return Err(PlanError::Computation(format!(
            "cannot schedule a route at {speed_kn} knots"
        )));
    }
    Ok(())
}

fn eta_at(
    departure: DateTime<Utc>,
    cumulative_nm: f64,
    speed_kn: f64,
) -> Result<DateTime<Utc>, PlanError> {
    let millis = (cumulative_nm / speed_kn * 3_600_000.0).round();
    let overflow = || {
        PlanError::Computation(format!(
            "ETA for {cumulative_nm:.1} nm at {speed_kn} knots is out of range"
        ))
    };
    // i64::MAX as f64 rounds up, so the bound is exclusive
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return Err(overflow());
    }
    Duration::try_milliseconds(millis as i64)
        .and_then(|offset| departure.checked_add_signed(offset))
        .ok_or_else(overflow)
}

/// Schedule a sequence of positions at constant speed.
pub fn schedule(
    points: &[Coordinate],
    departure: DateTime<Utc>,
    speed_kn: f64,
) -> Result<Vec<Leg>, PlanError> {
    check_speed(speed_kn)?;

    let mut cumulative = 0.0;
    let mut legs = Vec::with_capacity(points.len());
    for (i, point) in points.iter().enumerate() {
        let distance_from_prev = if i == 0 {
            0.0
        } else {
            distance_nm(&points[i - 1], point)
        };
        cumulative += distance_from_prev;
        legs.push(Leg {
            distance_from_prev,
            cumulative_distance: cumulative,
            eta: eta_at(departure, cumulative, speed_kn)?,
        });
    }
    Ok(legs)
}

/// Recompute distances, ETAs and ids for `waypoints`, then summarise the route.
pub fn compute(
    mut waypoints: Vec<Waypoint>,
    departure: DateTime<Utc>,
    speed_kn: f64,
) -> Result<(Vec<Waypoint>, RouteMetrics), PlanError> {
    check_speed(speed_kn)?;
    let (Some(first), Some(last)) = (waypoints.first(), waypoints.last()) else {
        return Err(PlanError::Computation("route has no waypoints".to_string()));
    };
    let direct_distance_nm = distance_nm(&first.coordinates, &last.coordinates);

    let positions: Vec<Coordinate> = waypoints.iter().map(|wp| wp.coordinates).collect();
    let legs = schedule(&positions, departure, speed_kn)?;
    for (index, (waypoint, leg)) in waypoints.iter_mut().zip(legs).enumerate() {
        waypoint.id = index;
        waypoint.distance_from_prev = leg.distance_from_prev;
        waypoint.cumulative_distance = leg.cumulative_distance;
        waypoint.eta = leg.eta;
    }

    let total_distance_nm = waypoints
        .last()
        .map(|wp| wp.cumulative_distance)
        .unwrap_or_default();
    let estimated_duration_hours = total_distance_nm / speed_kn;
    let average_speed_knots = if estimated_duration_hours > 0.0 {
        total_distance_nm / estimated_duration_hours
    } else {
        speed_kn
    };
    let arrival_time = waypoints.last().map(|wp| wp.eta).unwrap_or(departure);

    let metrics = RouteMetrics {
        total_distance_nm,
        total_distance_km: nm_to_km(total_distance_nm),
        direct_distance_nm,
        estimated_duration_hours,
        departure_time: departure,
        arrival_time,
        average_speed_knots,
        waypoints_adjusted: waypoints.iter().filter(|wp| wp.is_adjusted).count(),
        max_wind_speed: max_field(&waypoints, |w| w.wind_speed),
        max_wave_height: max_field(&waypoints, |w| w.wave_height),
        max_current_speed: max_field(&waypoints, |w| w.current_speed),
    };
    Ok((waypoints, metrics))
}

fn max_field(
    waypoints: &[Waypoint],
    field: impl Fn(&crate::models::WeatherSnapshot) -> Option<f64>,
) -> Option<f64> {
    waypoints
        .iter()
        .filter_map(|wp| wp.weather.as_ref().and_then(&field))
        .filter(|v| v.is_finite())
        .reduce(f64::max)
}
