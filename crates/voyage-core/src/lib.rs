pub mod adjust;
pub mod error;
pub mod hazard;
pub mod metrics;
pub mod models;
pub mod spatial;
pub mod warnings;

pub use adjust::{Adjustment, AdjustmentConfig, OffsetSide, RouteAdjuster, SidePolicy};
pub use error::{GeodesyError, PlanError, WeatherError};
pub use hazard::{
    assess, classify, penalty, HazardAssessment, HazardFinding, HazardParameter, HazardThresholds,
};
pub use models::{
    Coordinate, RouteMetrics, RouteRequest, RouteResponse, RouteWarning, WarningSeverity,
    Waypoint, WeatherSnapshot,
};
pub use spatial::{bearing_deg, destination, distance_nm, generate_waypoints, interpolate};
pub use warnings::{WarningSynthesizer, WaypointOutcome};
