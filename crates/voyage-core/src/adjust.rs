//! Perpendicular displacement of hazardous waypoints.
//!
//! A hazardous waypoint is moved a fixed distance at right angles to its
//! local route segment, the weather at the new position is fetched and
//! evaluated exactly once, and the displaced position is kept even when the
//! re-check is still hazardous.

use std::future::Future;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hazard::{self, HazardAssessment, HazardFinding, HazardThresholds};
use crate::models::{Coordinate, Waypoint, WeatherSnapshot};
use crate::spatial::{bearing_deg, destination, distance_nm, normalize_bearing};

pub const DEFAULT_OFFSET_NM: f64 = 75.0;
pub const DEFAULT_MAX_OFFSET_NM: f64 = 100.0;

/// Segments shorter than this have no usable bearing.
const MIN_SEGMENT_NM: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetSide {
    /// Right of the direction of travel
    Starboard,
    /// Left of the direction of travel
    Port,
}

impl OffsetSide {
    fn rotation_deg(&self) -> f64 {
        match self {
            OffsetSide::Starboard => 90.0,
            OffsetSide::Port => -90.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OffsetSide::Starboard => "starboard",
            OffsetSide::Port => "port",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SidePolicy {
    Fixed(OffsetSide),
    /// Evaluate both sides and keep the calmer one; ties go to starboard.
    LeastHazard,
}

impl FromStr for SidePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "starboard" | "right" => Ok(SidePolicy::Fixed(OffsetSide::Starboard)),
            "port" | "left" => Ok(SidePolicy::Fixed(OffsetSide::Port)),
            "least-hazard" | "least_hazard" | "auto" => Ok(SidePolicy::LeastHazard),
            other => Err(format!("unknown offset side policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentConfig {
    /// Perpendicular displacement in nautical miles
    pub offset_nm: f64,
    /// Hard cap on displacement
    pub max_offset_nm: f64,
    pub side_policy: SidePolicy,
}

impl Default for AdjustmentConfig {
    fn default() -> Self {
        Self {
            offset_nm: DEFAULT_OFFSET_NM,
            max_offset_nm: DEFAULT_MAX_OFFSET_NM,
            side_policy: SidePolicy::LeastHazard,
        }
    }
}

impl AdjustmentConfig {
    pub fn effective_offset_nm(&self) -> f64 {
        let offset = if self.offset_nm.is_finite() {
            self.offset_nm.max(0.0)
        } else {
            DEFAULT_OFFSET_NM
        };
        let cap = if self.max_offset_nm.is_finite() {
            self.max_offset_nm.max(0.0)
        } else {
            DEFAULT_MAX_OFFSET_NM
        };
        offset.min(cap)
    }
}

/// Outcome of one adjustment attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Adjustment {
    pub waypoint: Waypoint,
    pub adjusted: bool,
    pub side: Option<OffsetSide>,
    pub offset_nm: f64,
    /// Worst finding at the original position
    pub avoided: Option<HazardFinding>,
    /// Assessment at the final position
    pub recheck: HazardAssessment,
}

impl Adjustment {
    pub fn still_hazardous(&self) -> bool {
        self.adjusted && self.recheck.is_hazardous()
    }

    fn unchanged(waypoint: &Waypoint, assessment: HazardAssessment) -> Self {
        Self {
            waypoint: waypoint.clone(),
            adjusted: false,
            side: None,
            offset_nm: 0.0,
            avoided: None,
            recheck: assessment,
        }
    }
}

struct Candidate {
    side: OffsetSide,
    position: Coordinate,
    snapshot: WeatherSnapshot,
    assessment: HazardAssessment,
    penalty: f64,
}

impl Candidate {
    fn better_than(&self, other: &Candidate) -> bool {
        match (self.assessment.is_hazardous(), other.assessment.is_hazardous()) {
            (false, true) => true,
            (true, false) => false,
            _ => self.penalty < other.penalty,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteAdjuster {
    config: AdjustmentConfig,
}

impl RouteAdjuster {
    pub fn new(config: AdjustmentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AdjustmentConfig {
        &self.config
    }

    /// Bearing of the local route segment around `current`.
    pub fn segment_bearing(prev: &Coordinate, current: &Coordinate, next: &Coordinate) -> Option<f64> {
        if distance_nm(prev, next) > MIN_SEGMENT_NM {
            Some(bearing_deg(prev, next))
        } else if distance_nm(current, next) > MIN_SEGMENT_NM {
            Some(bearing_deg(current, next))
        } else if distance_nm(prev, current) > MIN_SEGMENT_NM {
            Some(bearing_deg(prev, current))
        } else {
            None
        }
    }

    /// Displace `waypoint` if its weather is hazardous.
    ///
    /// `fetch` is called once per candidate position (once for a fixed side,
    /// twice for least-hazard) and never again.
    pub async fn adjust<F, Fut>(
        &self,
        waypoint: &Waypoint,
        prev: &Coordinate,
        next: &Coordinate,
        thresholds: &HazardThresholds,
        fetch: F,
    ) -> Adjustment
    where
        F: Fn(Coordinate, DateTime<Utc>) -> Fut,
        Fut: Future<Output = WeatherSnapshot>,
    {
        let assessment = hazard::assess(waypoint.weather.as_ref(), thresholds);
        if !assessment.is_hazardous() {
            return Adjustment::unchanged(waypoint, assessment);
        }

        let offset_nm = self.config.effective_offset_nm();
        let Some(segment) = Self::segment_bearing(prev, &waypoint.coordinates, next) else {
            return Adjustment::unchanged(waypoint, assessment);
        };
        if offset_nm <= 0.0 {
            return Adjustment::unchanged(waypoint, assessment);
        }

        let evaluate = |side: OffsetSide| {
            let position = destination(
                &waypoint.coordinates,
                normalize_bearing(segment + side.rotation_deg()),
                offset_nm,
            );
            let pending = fetch(position, waypoint.eta);
            async move {
                let snapshot = pending.await;
                let weather = (!snapshot.is_empty()).then_some(&snapshot);
                let assessment = hazard::assess(weather, thresholds);
                let penalty = hazard::penalty(&snapshot);
                Candidate {
                    side,
                    position,
                    snapshot,
                    assessment,
                    penalty,
                }
            }
        };

        let chosen = match self.config.side_policy {
            SidePolicy::Fixed(side) => evaluate(side).await,
            SidePolicy::LeastHazard => {
                let (starboard, port) =
                    futures::join!(evaluate(OffsetSide::Starboard), evaluate(OffsetSide::Port));
                if port.better_than(&starboard) {
                    port
                } else {
                    starboard
                }
            }
        };

        let mut displaced = waypoint.clone();
        displaced.coordinates = chosen.position;
        displaced.is_adjusted = true;
        displaced = displaced.with_weather(chosen.snapshot);

        Adjustment {
            waypoint: displaced,
            adjusted: true,
            side: Some(chosen.side),
            offset_nm,
            avoided: assessment.worst().copied(),
            recheck: chosen.assessment,
        }
    }
}
