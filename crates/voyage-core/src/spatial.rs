//! Great-circle math on a spherical Earth.
//!
//! All distances are nautical miles and all angles exposed to callers are
//! degrees. Bearings are measured clockwise from true north in [0, 360).

use crate::error::GeodesyError;
use crate::models::Coordinate;
use std::f64::consts::PI;

/// Mean Earth radius in nautical miles.
pub const EARTH_RADIUS_NM: f64 = 3440.065;
pub const NM_TO_KM: f64 = 1.852;

/// Central angles below this are treated as the same point (~6 mm).
pub const IDENTICAL_TOLERANCE_RAD: f64 = 1e-9;
/// Central angles within this of pi are treated as antipodal (~6 m).
pub const ANTIPODAL_TOLERANCE_RAD: f64 = 1e-6;

/// Central angle between two points in radians (haversine form).
pub fn central_angle_rad(a: &Coordinate, b: &Coordinate) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lon - a.lon).to_radians();
    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);
    2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Great-circle distance in nautical miles.
///
/// `distance_nm(a, a) == 0` and the result is symmetric in its arguments.
pub fn distance_nm(a: &Coordinate, b: &Coordinate) -> f64 {
    EARTH_RADIUS_NM * central_angle_rad(a, b)
}

pub fn nm_to_km(nm: f64) -> f64 {
    nm * NM_TO_KM
}

/// Initial bearing from `a` to `b` in degrees [0, 360).
pub fn bearing_deg(a: &Coordinate, b: &Coordinate) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let delta_lambda = (b.lon - a.lon).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    normalize_bearing(x.atan2(y).to_degrees())
}

pub fn normalize_bearing(deg: f64) -> f64 {
    let b = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if b >= 360.0 {
        0.0
    } else {
        b
    }
}

/// Wrap a longitude into [-180, 180).
pub fn normalize_lon(lon_deg: f64) -> f64 {
    (lon_deg + 180.0).rem_euclid(360.0) - 180.0
}

/// Point reached by travelling `distance_nm` from `point` on an initial
/// bearing of `bearing_deg`.
pub fn destination(point: &Coordinate, bearing_deg: f64, distance_nm: f64) -> Coordinate {
    if distance_nm.abs() <= f64::EPSILON {
        return *point;
    }

    let lat1 = point.lat.to_radians();
    let lon1 = point.lon.to_radians();
    let bearing_rad = bearing_deg.to_radians();
    let angular_distance = distance_nm / EARTH_RADIUS_NM;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let lon2 = lon1 + y.atan2(x);

    Coordinate::new(lat2.to_degrees(), normalize_lon(lon2.to_degrees()))
}

fn check_endpoints(a: &Coordinate, b: &Coordinate) -> Result<f64, GeodesyError> {
    let d = central_angle_rad(a, b);
    if d < IDENTICAL_TOLERANCE_RAD {
        return Err(GeodesyError::IdenticalEndpoints);
    }
    if PI - d < ANTIPODAL_TOLERANCE_RAD {
        return Err(GeodesyError::AntipodalEndpoints);
    }
    Ok(d)
}

/// Spherical linear interpolation along the geodesic from `a` to `b`.
///
/// Fraction 0 returns `a` and fraction 1 returns `b` exactly.
pub fn interpolate(a: &Coordinate, b: &Coordinate, fraction: f64) -> Result<Coordinate, GeodesyError> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(GeodesyError::FractionOutOfRange(fraction));
    }
    let d = check_endpoints(a, b)?;
    Ok(slerp(a, b, d, fraction))
}

fn slerp(a: &Coordinate, b: &Coordinate, d: f64, fraction: f64) -> Coordinate {
    if fraction == 0.0 {
        return *a;
    }
    if fraction == 1.0 {
        return *b;
    }

    let phi1 = a.lat.to_radians();
    let lambda1 = a.lon.to_radians();
    let phi2 = b.lat.to_radians();
    let lambda2 = b.lon.to_radians();

    let sin_d = d.sin();
    let wa = ((1.0 - fraction) * d).sin() / sin_d;
    let wb = (fraction * d).sin() / sin_d;

    let x = wa * phi1.cos() * lambda1.cos() + wb * phi2.cos() * lambda2.cos();
    let y = wa * phi1.cos() * lambda1.sin() + wb * phi2.cos() * lambda2.sin();
    let z = wa * phi1.sin() + wb * phi2.sin();

    let lat = z.atan2((x * x + y * y).sqrt());
    let lon = y.atan2(x);
    Coordinate::new(lat.to_degrees(), normalize_lon(lon.to_degrees()))
}

/// `count` evenly fraction-spaced points from `start` to `end`, inclusive.
pub fn generate_waypoints(
    start: &Coordinate,
    end: &Coordinate,
    count: usize,
) -> Result<Vec<Coordinate>, GeodesyError> {
    if count < 2 {
        return Err(GeodesyError::TooFewWaypoints(count));
    }
    let d = check_endpoints(start, end)?;
    let last = (count - 1) as f64;
    Ok((0..count)
        .map(|i| slerp(start, end, d, i as f64 / last))
        .collect())
}

/// Sum of great-circle legs along a polyline.
pub fn path_length_nm(points: &[Coordinate]) -> f64 {
    points
        .windows(2)
        .map(|pair| distance_nm(&pair[0], &pair[1]))
        .sum()
}
