//! Voyage CLI - command line access to the voyage planner.
//!
//! - plan_voyage: plan a route in-process or against a running server

pub mod client;
pub mod render;

pub use client::PlannerClient;
pub use render::{parse_coordinate, render_route};
