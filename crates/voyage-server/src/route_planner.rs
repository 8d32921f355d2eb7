//! Weather-aware great-circle route planning.
//!
//! One pass per request: generate waypoints, resolve weather for each one
//! concurrently (with at most one avoidance re-check), then recompute
//! distances/ETAs and synthesise warnings. The whole pass is bounded by a
//! deadline; waypoints still pending when it expires are returned without
//! weather and flagged as unavailable.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};

use voyage_core::adjust::{AdjustmentConfig, RouteAdjuster};
use voyage_core::hazard::{HazardThresholds, DEFAULT_DANGER_RATIO};
use voyage_core::metrics;
use voyage_core::spatial::generate_waypoints;
use voyage_core::warnings::{WarningSynthesizer, WaypointOutcome};
use voyage_core::{Coordinate, PlanError, RouteRequest, RouteResponse, Waypoint};

use crate::config::{Config, MAX_PLAN_DEADLINE};
use crate::weather::WeatherAggregator;

pub const ALGORITHM_TAG: &str = "great_circle_with_weather_avoidance";

/// Progress callbacks for a single plan. Calls arrive in completion order.
pub trait PlanObserver: Send + Sync {
    fn on_waypoint_resolved(&self, _index: usize, _total: usize) {}
    fn on_waypoint_adjusted(&self, _index: usize, _offset_nm: f64) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PlanObserver for NoopObserver {}

#[derive(Debug, Clone)]
pub struct PlannerSettings {
    pub adjustment: AdjustmentConfig,
    pub danger_ratio: f64,
    pub fetch_concurrency: usize,
    pub plan_deadline: Duration,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            adjustment: AdjustmentConfig::default(),
            danger_ratio: DEFAULT_DANGER_RATIO,
            fetch_concurrency: 8,
            plan_deadline: Duration::from_secs(45),
        }
    }
}

impl PlannerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            adjustment: config.adjustment(),
            danger_ratio: config.danger_ratio,
            fetch_concurrency: config.fetch_concurrency.clamp(1, 32),
            plan_deadline: config.plan_deadline.min(MAX_PLAN_DEADLINE),
        }
    }
}

struct Resolved {
    waypoint: Waypoint,
    outcome: WaypointOutcome,
}

pub struct RoutePlanner {
    weather: Arc<WeatherAggregator>,
    adjuster: RouteAdjuster,
    settings: PlannerSettings,
}

impl RoutePlanner {
    pub fn new(weather: Arc<WeatherAggregator>, settings: PlannerSettings) -> Self {
        Self {
            weather,
            adjuster: RouteAdjuster::new(settings.adjustment),
            settings,
        }
    }

    pub fn weather(&self) -> &Arc<WeatherAggregator> {
        &self.weather
    }

    pub fn settings(&self) -> &PlannerSettings {
        &self.settings
    }

    pub async fn plan_route(&self, request: &RouteRequest) -> Result<RouteResponse, PlanError> {
        self.plan_route_with_observer(request, &NoopObserver).await
    }

    pub async fn plan_route_with_observer(
        &self,
        request: &RouteRequest,
        observer: &dyn PlanObserver,
    ) -> Result<RouteResponse, PlanError> {
        let started = std::time::Instant::now();
        let now = tokio::time::Instant::now();
        let deadline = now
            .checked_add(self.settings.plan_deadline)
            .or_else(|| now.checked_add(MAX_PLAN_DEADLINE))
            .unwrap_or(now);
        request.validate()?;

        let thresholds = HazardThresholds::from_request(request, self.settings.danger_ratio);
        let positions = generate_waypoints(&request.start, &request.end, request.waypoints_count)?;
        let legs = metrics::schedule(&positions, request.departure_time, request.vessel_speed)?;
        let baseline: Vec<Waypoint> = positions
            .iter()
            .zip(&legs)
            .enumerate()
            .map(|(index, (position, leg))| {
                let mut waypoint = Waypoint::new(index, *position, leg.eta);
                waypoint.distance_from_prev = leg.distance_from_prev;
                waypoint.cumulative_distance = leg.cumulative_distance;
                waypoint
            })
            .collect();

        let total = baseline.len();
        tracing::info!(
            waypoints = total,
            speed_kn = request.vessel_speed,
            avoid = request.avoid_extreme_weather,
            "Planning route"
        );

        let mut slots: Vec<Option<Resolved>> = (0..total).map(|_| None).collect();
        let mut pending = stream::iter(0..total)
            .map(|index| self.resolve_waypoint(index, &baseline, &thresholds, request))
            .buffer_unordered(self.settings.fetch_concurrency.max(1));

        loop {
            match tokio::time::timeout_at(deadline, pending.next()).await {
                Ok(Some((index, resolved))) => {
                    if let Some(offset) = resolved.outcome.adjusted_offset_nm {
                        observer.on_waypoint_adjusted(index, offset);
                    }
                    slots[index] = Some(resolved);
                    observer.on_waypoint_resolved(index, total);
                }
                Ok(None) => break,
                Err(_) => {
                    let unresolved = slots.iter().filter(|slot| slot.is_none()).count();
                    tracing::warn!(
                        unresolved,
                        deadline_ms = self.settings.plan_deadline.as_millis() as u64,
                        "Planning deadline reached; finalizing without remaining weather"
                    );
                    break;
                }
            }
        }
        drop(pending);

        let (waypoints, outcomes): (Vec<Waypoint>, Vec<WaypointOutcome>) = slots
            .into_iter()
            .zip(baseline)
            .map(|(slot, fallback)| match slot {
                Some(resolved) => (resolved.waypoint, resolved.outcome),
                None => (
                    fallback,
                    WaypointOutcome {
                        unresolved: true,
                        ..Default::default()
                    },
                ),
            })
            .unzip();

        let (mut waypoints, route_metrics) =
            metrics::compute(waypoints, request.departure_time, request.vessel_speed)?;
        let warnings = WarningSynthesizer::new(thresholds).synthesize(&mut waypoints, &outcomes);

        let calculation_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        tracing::info!(
            total_distance_nm = route_metrics.total_distance_nm,
            adjusted = route_metrics.waypoints_adjusted,
            warnings = warnings.len(),
            calculation_time_ms,
            "Route planned"
        );

        Ok(RouteResponse {
            request: request.clone(),
            waypoints,
            metrics: route_metrics,
            warnings,
            algorithm: ALGORITHM_TAG.to_string(),
            calculated_at: Utc::now(),
            calculation_time_ms,
        })
    }

    /// Fetch, evaluate and (for interior waypoints) adjust one waypoint.
    async fn resolve_waypoint(
        &self,
        index: usize,
        baseline: &[Waypoint],
        thresholds: &HazardThresholds,
        request: &RouteRequest,
    ) -> (usize, Resolved) {
        let original = &baseline[index];
        let report = self
            .weather
            .get_report(original.coordinates, original.eta)
            .await;
        let waypoint = original.clone().with_weather(report.snapshot);
        let mut outcome = WaypointOutcome {
            degraded_sources: report.degraded_sources,
            ..Default::default()
        };

        let interior = index > 0 && index + 1 < baseline.len();
        if !request.avoid_extreme_weather || !interior {
            return (index, Resolved { waypoint, outcome });
        }

        let prev = baseline[index - 1].coordinates;
        let next = baseline[index + 1].coordinates;
        let weather = Arc::clone(&self.weather);
        let adjustment = self
            .adjuster
            .adjust(
                &waypoint,
                &prev,
                &next,
                thresholds,
                move |position: Coordinate, time: DateTime<Utc>| {
                    let weather = Arc::clone(&weather);
                    async move { weather.get(position, time).await }
                },
            )
            .await;

        if adjustment.adjusted {
            outcome.adjusted_offset_nm = Some(adjustment.offset_nm);
            outcome.side = adjustment.side;
            outcome.avoided = adjustment.avoided;
            if adjustment.still_hazardous() {
                tracing::warn!(
                    index,
                    offset_nm = adjustment.offset_nm,
                    "Waypoint still hazardous after avoidance"
                );
            } else {
                tracing::debug!(index, offset_nm = adjustment.offset_nm, "Waypoint adjusted");
            }
        }

        (
            index,
            Resolved {
                waypoint: adjustment.waypoint,
                outcome,
            },
        )
    }
}
