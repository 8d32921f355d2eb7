//! Route planner integration tests over scripted and synthetic weather.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use common::{aggregator, MockCurrents, MockWindWave, Storm};
use voyage_core::spatial::generate_waypoints;
use voyage_core::{distance_nm, Coordinate, RouteRequest, WarningSeverity};
use voyage_server::cache::{CacheGrid, TtlCache};
use voyage_server::weather::{ClimatologyCurrentSource, SyntheticWindWaveSource, WeatherAggregator};
use voyage_server::{PlanObserver, PlannerSettings, RoutePlanner};

fn departure() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
}

fn equator_request(count: usize) -> RouteRequest {
    let mut request = RouteRequest::new(
        Coordinate::new(0.0, 0.0),
        Coordinate::new(0.0, 20.0),
        departure(),
    );
    request.waypoints_count = count;
    request
}

fn planner(wind: Arc<MockWindWave>, settings: PlannerSettings) -> RoutePlanner {
    let weather = aggregator(wind, Arc::new(MockCurrents::default()), Duration::from_secs(600));
    RoutePlanner::new(Arc::new(weather), settings)
}

fn storm_at_midpoint() -> Storm {
    Storm {
        center: Coordinate::new(0.0, 10.0),
        radius_nm: 30.0,
        wind_kn: 50.0,
        wave_m: 8.0,
    }
}

#[tokio::test]
async fn calm_route_is_the_plain_great_circle() {
    let planner = planner(Arc::new(MockWindWave::calm()), PlannerSettings::default());
    let request = equator_request(5);
    let response = planner.plan_route(&request).await.unwrap();

    assert_eq!(response.waypoints.len(), 5);
    assert!(response.waypoints.iter().all(|w| !w.is_adjusted));
    assert_eq!(response.metrics.waypoints_adjusted, 0);
    assert!(response.warnings.is_empty(), "{:?}", response.warnings);

    let direct = distance_nm(&request.start, &request.end);
    assert!((response.metrics.total_distance_nm - direct).abs() < 1e-6);
    let hours = direct / request.vessel_speed;
    assert!((response.metrics.estimated_duration_hours - hours).abs() < 1e-6);
    assert_eq!(response.metrics.max_wind_speed, Some(10.0));
    assert_eq!(response.metrics.max_current_speed, Some(0.8));
}

#[tokio::test]
async fn hazardous_interior_waypoint_is_displaced() {
    let wind = Arc::new(MockWindWave::with_storm(storm_at_midpoint()));
    let planner = planner(wind, PlannerSettings::default());
    let request = equator_request(5);
    let response = planner.plan_route(&request).await.unwrap();

    let middle = &response.waypoints[2];
    assert!(middle.is_adjusted);
    let moved = distance_nm(&Coordinate::new(0.0, 10.0), &middle.coordinates);
    assert!((moved - 75.0).abs() < 0.5, "moved {moved} nm");
    assert_eq!(middle.weather.as_ref().unwrap().wind_speed, Some(10.0));
    assert!(middle.warnings.iter().any(|note| note.starts_with("Adjusted 75 nm")));

    assert_eq!(response.metrics.waypoints_adjusted, 1);
    assert!(response.metrics.total_distance_nm > response.metrics.direct_distance_nm);
    assert_eq!(response.waypoints[0].coordinates, request.start);
    assert_eq!(response.waypoints[4].coordinates, request.end);

    let reroute = response
        .warnings
        .iter()
        .find(|w| w.waypoint_id == 2 && w.message.starts_with("Rerouted"))
        .expect("reroute warning");
    assert_eq!(reroute.severity, WarningSeverity::Danger);
}

#[tokio::test]
async fn avoidance_disabled_reports_hazard_in_place() {
    let wind = Arc::new(MockWindWave::with_storm(storm_at_midpoint()));
    let planner = planner(wind, PlannerSettings::default());
    let mut request = equator_request(5);
    request.avoid_extreme_weather = false;
    let response = planner.plan_route(&request).await.unwrap();

    assert!(response.waypoints.iter().all(|w| !w.is_adjusted));
    let hazards: Vec<_> = response
        .warnings
        .iter()
        .filter(|w| w.waypoint_id == 2 && w.message.contains("exceeds threshold"))
        .collect();
    assert_eq!(hazards.len(), 2);
    assert!(hazards.iter().all(|w| w.severity == WarningSeverity::Danger));
    assert_eq!(response.metrics.max_wind_speed, Some(50.0));
}

#[tokio::test]
async fn storm_at_endpoint_is_never_displaced() {
    let wind = Arc::new(MockWindWave::with_storm(Storm {
        center: Coordinate::new(0.0, 20.0),
        ..storm_at_midpoint()
    }));
    let planner = planner(wind, PlannerSettings::default());
    let request = equator_request(5);
    let response = planner.plan_route(&request).await.unwrap();

    let last = response.waypoints.last().unwrap();
    assert!(!last.is_adjusted);
    assert_eq!(last.coordinates, request.end);
    assert!(response
        .warnings
        .iter()
        .any(|w| w.waypoint_id == 4 && w.parameter == "wind"));
}

#[tokio::test(start_paused = true)]
async fn deadline_finalizes_pending_waypoints_as_unavailable() {
    let wind = Arc::new(MockWindWave::slow(Duration::from_secs(3600)));
    let weather = WeatherAggregator::new(
        wind,
        Arc::new(MockCurrents::default()),
        Arc::new(TtlCache::new(Duration::from_secs(600), 1024)),
        CacheGrid::new(0.25, 60),
        Duration::from_secs(7200),
    );
    let settings = PlannerSettings {
        plan_deadline: Duration::from_millis(200),
        ..PlannerSettings::default()
    };
    let planner = RoutePlanner::new(Arc::new(weather), settings);
    let response = planner.plan_route(&equator_request(4)).await.unwrap();

    assert_eq!(response.waypoints.len(), 4);
    assert!(response.waypoints.iter().all(|w| w.weather.is_none()));
    let unavailable = response
        .warnings
        .iter()
        .filter(|w| w.message.starts_with("Weather data unavailable"))
        .count();
    assert_eq!(unavailable, 4);
    assert!((response.metrics.total_distance_nm - response.metrics.direct_distance_nm).abs() < 1e-6);
}

#[tokio::test]
async fn degraded_source_is_reported_per_waypoint() {
    let weather = aggregator(
        Arc::new(MockWindWave::failing()),
        Arc::new(MockCurrents::default()),
        Duration::from_secs(600),
    );
    let planner = RoutePlanner::new(Arc::new(weather), PlannerSettings::default());
    let response = planner.plan_route(&equator_request(3)).await.unwrap();

    let partial = response
        .warnings
        .iter()
        .filter(|w| w.message == "Partial weather: mock-wind unavailable")
        .count();
    assert_eq!(partial, 3);
    assert!(response.waypoints.iter().all(|w| w.weather.is_some()));
    assert_eq!(response.metrics.max_wind_speed, None);
}

#[tokio::test(start_paused = true)]
async fn fetches_respect_the_concurrency_cap() {
    let wind = Arc::new(MockWindWave::slow(Duration::from_millis(50)));
    let settings = PlannerSettings {
        fetch_concurrency: 2,
        ..PlannerSettings::default()
    };
    let planner = planner(wind.clone(), settings);
    planner.plan_route(&equator_request(10)).await.unwrap();

    assert_eq!(wind.calls(), 10);
    assert!(wind.max_in_flight.load(Ordering::SeqCst) <= 2);
}

#[tokio::test(start_paused = true)]
async fn out_of_order_fetches_keep_route_order() {
    // Waypoint 0 sits furthest west and resolves last
    let wind = Arc::new(MockWindWave::slower_westward(Duration::from_millis(10)));
    let settings = PlannerSettings {
        fetch_concurrency: 8,
        ..PlannerSettings::default()
    };
    let planner = planner(wind.clone(), settings);
    let request = equator_request(8);
    let response = planner.plan_route(&request).await.unwrap();

    let expected = generate_waypoints(&request.start, &request.end, 8).unwrap();
    assert_eq!(wind.calls(), 8);
    assert!(wind.max_in_flight.load(Ordering::SeqCst) > 1);
    assert_eq!(response.waypoints.len(), expected.len());
    for (index, (waypoint, position)) in response.waypoints.iter().zip(&expected).enumerate() {
        assert_eq!(waypoint.id, index);
        assert!((waypoint.coordinates.lat - position.lat).abs() < 1e-9);
        assert!((waypoint.coordinates.lon - position.lon).abs() < 1e-9);
        assert!(waypoint.weather.is_some());
    }
    assert!(response
        .waypoints
        .windows(2)
        .all(|pair| pair[0].eta <= pair[1].eta));
}

#[tokio::test]
async fn oversized_deadline_does_not_overflow() {
    let settings = PlannerSettings {
        plan_deadline: Duration::MAX,
        ..PlannerSettings::default()
    };
    let planner = planner(Arc::new(MockWindWave::calm()), settings);
    let response = planner.plan_route(&equator_request(3)).await.unwrap();
    assert!(response.waypoints.iter().all(|w| w.weather.is_some()));
}

#[derive(Default)]
struct RecordingObserver {
    resolved: AtomicUsize,
    adjusted: Mutex<Vec<(usize, f64)>>,
}

impl PlanObserver for RecordingObserver {
    fn on_waypoint_resolved(&self, _index: usize, total: usize) {
        assert_eq!(total, 5);
        self.resolved.fetch_add(1, Ordering::SeqCst);
    }

    fn on_waypoint_adjusted(&self, index: usize, offset_nm: f64) {
        self.adjusted.lock().unwrap().push((index, offset_nm));
    }
}

#[tokio::test]
async fn observer_sees_every_waypoint_and_each_adjustment() {
    let wind = Arc::new(MockWindWave::with_storm(storm_at_midpoint()));
    let planner = planner(wind, PlannerSettings::default());
    let observer = RecordingObserver::default();
    planner
        .plan_route_with_observer(&equator_request(5), &observer)
        .await
        .unwrap();

    assert_eq!(observer.resolved.load(Ordering::SeqCst), 5);
    assert_eq!(*observer.adjusted.lock().unwrap(), vec![(2, 75.0)]);
}

#[tokio::test]
async fn invalid_request_fails_before_any_fetch() {
    let wind = Arc::new(MockWindWave::calm());
    let planner = planner(wind.clone(), PlannerSettings::default());
    let mut request = equator_request(5);
    request.vessel_speed = -3.0;
    assert!(planner.plan_route(&request).await.is_err());
    assert_eq!(wind.calls(), 0);
}

#[tokio::test]
async fn singapore_to_rotterdam_with_synthetic_weather() {
    let weather = WeatherAggregator::new(
        Arc::new(SyntheticWindWaveSource::default()),
        Arc::new(ClimatologyCurrentSource::new()),
        Arc::new(TtlCache::new(Duration::from_secs(600), 4096)),
        CacheGrid::new(0.25, 60),
        Duration::from_secs(5),
    );
    let planner = RoutePlanner::new(Arc::new(weather), PlannerSettings::default());
    let request = RouteRequest::new(
        Coordinate::new(1.3521, 103.8198),
        Coordinate::new(51.9244, 4.4777),
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    );
    let response = planner.plan_route(&request).await.unwrap();

    assert_eq!(response.waypoints.len(), 20);
    assert_eq!(response.waypoints[0].coordinates, request.start);
    assert_eq!(response.waypoints[19].coordinates, request.end);
    assert_eq!(response.waypoints[0].eta, request.departure_time);
    for (index, pair) in response.waypoints.windows(2).enumerate() {
        assert_eq!(pair[0].id, index);
        assert!(pair[1].eta > pair[0].eta);
        assert!(pair[1].cumulative_distance > pair[0].cumulative_distance);
    }
    assert!(response.waypoints.iter().all(|w| w.weather.is_some()));

    let legs: f64 = response.waypoints.iter().map(|w| w.distance_from_prev).sum();
    assert!((legs - response.waypoints[19].cumulative_distance).abs() < 1e-6);

    let metrics = &response.metrics;
    assert!(metrics.total_distance_nm > 0.0);
    assert!(metrics.arrival_time > metrics.departure_time);
    assert!(metrics.total_distance_nm + 1e-6 >= metrics.direct_distance_nm);
    assert!((metrics.total_distance_km - metrics.total_distance_nm * 1.852).abs() < 1e-6);
    assert_eq!(metrics.arrival_time, response.waypoints[19].eta);
    let adjusted = response.waypoints.iter().filter(|w| w.is_adjusted).count();
    assert_eq!(metrics.waypoints_adjusted, adjusted);
    assert!(response.warnings.iter().all(|w| w.waypoint_id < 20));
    assert!(response
        .warnings
        .windows(2)
        .all(|pair| pair[0].waypoint_id <= pair[1].waypoint_id));
}
