//! CLI tool to plan a weather-aware voyage.
//!
//! Plans in-process using the server's configuration (VOYAGE_* environment
//! variables) unless `--url` points at a running voyage server.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voyage_cli::{parse_coordinate, render_route, PlannerClient};
use voyage_core::models::{DEFAULT_VESSEL_SPEED_KN, DEFAULT_WAYPOINTS_COUNT};
use voyage_core::{Coordinate, RouteRequest};
use voyage_server::{AppState, Config};

/// Plan a great-circle voyage with weather avoidance
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Departure position as LAT,LON
    #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
    from: Coordinate,

    /// Destination position as LAT,LON
    #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
    to: Coordinate,

    /// Departure time (RFC 3339); defaults to now
    #[arg(long)]
    departure: Option<DateTime<Utc>>,

    /// Vessel speed in knots
    #[arg(long, default_value_t = DEFAULT_VESSEL_SPEED_KN)]
    speed: f64,

    /// Number of waypoints including both endpoints
    #[arg(long, default_value_t = DEFAULT_WAYPOINTS_COUNT)]
    waypoints: usize,

    /// Report hazards without displacing waypoints
    #[arg(long)]
    no_avoid: bool,

    /// Voyage server URL; plans in-process when omitted
    #[arg(long)]
    url: Option<String>,

    /// Print the full response as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("voyage_server=warn".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut request = RouteRequest::new(
        args.from,
        args.to,
        args.departure.unwrap_or_else(Utc::now),
    );
    request.vessel_speed = args.speed;
    request.waypoints_count = args.waypoints;
    request.avoid_extreme_weather = !args.no_avoid;

    let response = match &args.url {
        Some(url) => {
            eprintln!("Planning via {url}...");
            PlannerClient::new(url.as_str()).plan(&request).await?
        }
        None => {
            let state = AppState::from_config(Config::from_env())?;
            state.planner().plan_route(&request).await?
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print!("{}", render_route(&response));
    }
    Ok(())
}
