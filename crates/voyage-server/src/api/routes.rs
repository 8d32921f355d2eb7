//! Route handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use voyage_core::{Coordinate, PlanError, RouteRequest, RouteResponse};

use super::request_id::RequestId;
use crate::cache::CacheStats;
use crate::state::AppState;
use crate::weather::{Bbox, LayerResolution, LayerType, SnapshotReport, WeatherLayer};

type ApiError = (StatusCode, Json<Value>);

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/v1/routes/plan", post(plan_route))
        .route("/v1/routes/sample", get(sample_routes))
        .route("/v1/weather/point", get(weather_point))
        .route("/v1/weather/batch", post(weather_batch))
        .route("/v1/weather/layer", post(weather_layer))
        .route("/v1/weather/cache/stats", get(cache_stats))
        .route("/v1/weather/cache/clear", post(clear_cache))
}

// === Request/Response types ===

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub weather_sources: Vec<String>,
    pub plans_served: u64,
}

#[derive(Debug, Deserialize)]
pub struct WeatherPointQuery {
    pub lat: f64,
    pub lon: f64,
    /// Defaults to now
    pub time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct WeatherPointResponse {
    pub position: Coordinate,
    pub time: DateTime<Utc>,
    #[serde(flatten)]
    pub report: SnapshotReport,
}

/// Upper bound on points in one batch lookup.
pub const MAX_BATCH_POINTS: usize = 500;

#[derive(Debug, Deserialize)]
pub struct BatchPoint {
    pub lat: f64,
    #[serde(alias = "lng")]
    pub lon: f64,
    /// Defaults to now
    #[serde(alias = "timestamp")]
    pub time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct WeatherLayerRequest {
    pub layer_type: LayerType,
    pub bbox: Bbox,
    /// Defaults to now
    #[serde(default, alias = "time")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resolution: LayerResolution,
}

#[derive(Debug, Serialize)]
pub struct SampleRoute {
    pub name: &'static str,
    pub description: &'static str,
    pub request: RouteRequest,
}

fn plan_error(err: PlanError) -> ApiError {
    let status = match err {
        PlanError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        PlanError::Computation(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() })))
}

fn json_error(rejection: JsonRejection) -> ApiError {
    plan_error(PlanError::InvalidRequest(rejection.body_text()))
}

// === Handlers ===

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let (wind_wave, currents) = state.weather().source_names();
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        weather_sources: vec![wind_wave, currents],
        plans_served: state.plans_served(),
    })
}

async fn plan_route(
    State(state): State<Arc<AppState>>,
    request_id: Option<Extension<RequestId>>,
    body: Result<Json<RouteRequest>, JsonRejection>,
) -> Result<Json<RouteResponse>, ApiError> {
    let Json(request) = body.map_err(json_error)?;
    let request_id = request_id.map(|Extension(id)| id.0);
    tracing::info!(
        request_id = request_id.as_deref().unwrap_or("-"),
        start_lat = request.start.lat,
        start_lon = request.start.lon,
        end_lat = request.end.lat,
        end_lon = request.end.lon,
        "Route plan requested"
    );

    match state.planner().plan_route(&request).await {
        Ok(response) => {
            state.record_plan();
            Ok(Json(response))
        }
        Err(err) => {
            tracing::warn!(error = %err, "Route plan rejected");
            Err(plan_error(err))
        }
    }
}

async fn sample_routes() -> Json<Vec<SampleRoute>> {
    Json(sample_requests(Utc::now()))
}

pub fn sample_requests(departure: DateTime<Utc>) -> Vec<SampleRoute> {
    let mut transpacific = RouteRequest::new(
        Coordinate::new(31.2304, 121.4737),
        Coordinate::new(33.7405, -118.2775),
        departure,
    );
    transpacific.vessel_speed = 18.0;
    transpacific.waypoints_count = 30;

    let mut transatlantic = RouteRequest::new(
        Coordinate::new(40.6892, -74.0445),
        Coordinate::new(50.9097, -1.4044),
        departure,
    );
    transatlantic.vessel_speed = 20.0;
    transatlantic.waypoints_count = 15;

    vec![
        SampleRoute {
            name: "Singapore to Rotterdam",
            description: "Asia-Europe trade lane via the Indian Ocean",
            request: RouteRequest::new(
                Coordinate::new(1.2644, 103.8200),
                Coordinate::new(51.9225, 4.4792),
                departure,
            ),
        },
        SampleRoute {
            name: "Shanghai to Los Angeles",
            description: "Transpacific crossing",
            request: transpacific,
        },
        SampleRoute {
            name: "New York to Southampton",
            description: "North Atlantic crossing",
            request: transatlantic,
        },
    ]
}

async fn weather_point(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WeatherPointQuery>,
) -> Result<Json<WeatherPointResponse>, ApiError> {
    let position = Coordinate::new(query.lat, query.lon);
    position.validate("point").map_err(plan_error)?;
    let time = query.time.unwrap_or_else(Utc::now);
    let report = state.weather().get_report(position, time).await;
    Ok(Json(WeatherPointResponse {
        position,
        time,
        report,
    }))
}

async fn weather_batch(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Vec<BatchPoint>>, JsonRejection>,
) -> Result<Json<Vec<WeatherPointResponse>>, ApiError> {
    let Json(points) = body.map_err(json_error)?;
    if points.is_empty() {
        return Err(plan_error(PlanError::InvalidRequest(
            "no waypoints provided".to_string(),
        )));
    }
    if points.len() > MAX_BATCH_POINTS {
        return Err(plan_error(PlanError::InvalidRequest(format!(
            "at most {MAX_BATCH_POINTS} points per batch, got {}",
            points.len()
        ))));
    }

    let now = Utc::now();
    let mut lookups = Vec::with_capacity(points.len());
    for (index, point) in points.iter().enumerate() {
        let position = Coordinate::new(point.lat, point.lon);
        position
            .validate(&format!("point {index}"))
            .map_err(plan_error)?;
        lookups.push((position, point.time.unwrap_or(now)));
    }

    let reports = state
        .weather()
        .get_batch(&lookups, state.config().fetch_concurrency)
        .await;
    tracing::info!(points = reports.len(), "Batch weather served");
    Ok(Json(
        lookups
            .into_iter()
            .zip(reports)
            .map(|((position, time), report)| WeatherPointResponse {
                position,
                time,
                report,
            })
            .collect(),
    ))
}

async fn weather_layer(
    State(state): State<Arc<AppState>>,
    body: Result<Json<WeatherLayerRequest>, JsonRejection>,
) -> Result<Json<WeatherLayer>, ApiError> {
    let Json(request) = body.map_err(json_error)?;
    let time = request.timestamp.unwrap_or_else(Utc::now);
    let layer = state
        .weather()
        .layer(request.layer_type, request.bbox, time, request.resolution)
        .await
        .map_err(plan_error)?;
    Ok(Json(layer))
}

async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(state.weather().cache_stats())
}

async fn clear_cache(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cleared = state.weather().clear_cache();
    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "message": "Weather cache cleared",
            "cleared": cleared
        })),
    )
}
