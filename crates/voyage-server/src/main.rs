//! Voyage Server - HTTP front end for weather-aware route planning

use anyhow::Result;
use axum::middleware;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voyage_server::{api, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("voyage_server=debug".parse()?),
        )
        .init();

    tracing::info!("Starting Voyage Server...");

    let config = Config::from_env();
    let port = config.server_port;
    let state = Arc::new(AppState::from_config(config)?);

    let app = api::routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(api::request_id::ensure_request_id))
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
