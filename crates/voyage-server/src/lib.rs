//! Weather-aware voyage planning service: weather sources, caching, the
//! route planner and its HTTP surface.

pub mod api;
pub mod cache;
pub mod config;
pub mod route_planner;
pub mod state;
pub mod weather;

pub use config::Config;
pub use route_planner::{NoopObserver, PlanObserver, PlannerSettings, RoutePlanner};
pub use state::AppState;
