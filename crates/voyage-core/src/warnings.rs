//! Turns hazard and adjustment outcomes into ordered route warnings.

use crate::adjust::OffsetSide;
use crate::hazard::{self, HazardFinding, HazardParameter, HazardThresholds};
use crate::models::{RouteWarning, WarningSeverity, Waypoint};

/// What happened to one waypoint during planning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaypointOutcome {
    /// Displacement applied, if any
    pub adjusted_offset_nm: Option<f64>,
    pub side: Option<OffsetSide>,
    /// Worst finding at the pre-adjustment position
    pub avoided: Option<HazardFinding>,
    /// Weather was not resolved before the planning deadline
    pub unresolved: bool,
    /// Sources that failed for this waypoint
    pub degraded_sources: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct WarningSynthesizer {
    thresholds: HazardThresholds,
}

fn label(parameter: HazardParameter) -> &'static str {
    match parameter {
        HazardParameter::Wind => "Wind",
        HazardParameter::Waves => "Waves",
    }
}

fn waypoint_note(parameter: HazardParameter, value: f64) -> String {
    match parameter {
        HazardParameter::Wind => format!("High wind: {value:.1} kts"),
        HazardParameter::Waves => format!("High waves: {value:.1} m"),
    }
}

impl WarningSynthesizer {
    pub fn new(thresholds: HazardThresholds) -> Self {
        Self { thresholds }
    }

    /// Build warnings for the final route and refresh each waypoint's notes.
    ///
    /// `outcomes` is positional: `outcomes[i]` describes `waypoints[i]`.
    /// Warnings reference the waypoint's final id and are sorted by id, then
    /// by severity, most severe first.
    pub fn synthesize(
        &self,
        waypoints: &mut [Waypoint],
        outcomes: &[WaypointOutcome],
    ) -> Vec<RouteWarning> {
        let empty = WaypointOutcome::default();
        let mut warnings = Vec::new();

        for (index, waypoint) in waypoints.iter_mut().enumerate() {
            let outcome = outcomes.get(index).unwrap_or(&empty);
            waypoint.warnings.clear();
            self.for_waypoint(waypoint, outcome, &mut warnings);
        }

        warnings.sort_by(|a, b| {
            a.waypoint_id
                .cmp(&b.waypoint_id)
                .then_with(|| b.severity.cmp(&a.severity))
        });
        warnings
    }

    fn for_waypoint(
        &self,
        waypoint: &mut Waypoint,
        outcome: &WaypointOutcome,
        warnings: &mut Vec<RouteWarning>,
    ) {
        let id = waypoint.id;
        let mut push = |severity, parameter: &str, message: String, value: Option<f64>| {
            warnings.push(RouteWarning {
                severity,
                waypoint_id: id,
                message,
                parameter: parameter.to_string(),
                value,
            });
        };

        if outcome.unresolved {
            push(
                WarningSeverity::Warning,
                "weather",
                "Weather data unavailable: planning deadline reached before the forecast resolved"
                    .to_string(),
                None,
            );
            waypoint.warnings.push("Weather unavailable".to_string());
        }

        if let (Some(offset), Some(found)) = (outcome.adjusted_offset_nm, outcome.avoided) {
            let side = outcome.side.map(|s| s.as_str()).unwrap_or("off-track");
            push(
                found.severity,
                found.parameter.as_str(),
                format!(
                    "Rerouted {offset:.0} nm to {side} to avoid {} of {:.1} {} (threshold {:.1} {})",
                    found.parameter.as_str(),
                    found.value,
                    found.parameter.unit(),
                    found.threshold,
                    found.parameter.unit(),
                ),
                Some(found.value),
            );
            waypoint
                .warnings
                .push(format!("Adjusted {offset:.0} nm {side} to avoid {}", found.parameter.as_str()));
        }

        for source in &outcome.degraded_sources {
            push(
                WarningSeverity::Info,
                "weather",
                format!("Partial weather: {source} unavailable"),
                None,
            );
        }

        let Some(weather) = waypoint.weather.as_ref() else {
            if !outcome.unresolved {
                push(
                    WarningSeverity::Info,
                    "weather",
                    "No weather data available".to_string(),
                    None,
                );
                waypoint.warnings.push("No weather data".to_string());
            }
            return;
        };

        let assessment = hazard::assess(Some(weather), &self.thresholds);
        let adjusted = outcome.adjusted_offset_nm.is_some();
        for finding in &assessment.findings {
            let unit = finding.parameter.unit();
            let (severity, message) = if adjusted {
                (
                    WarningSeverity::Danger,
                    format!(
                        "{} still {:.1} {unit} after rerouting (threshold {:.1} {unit})",
                        label(finding.parameter),
                        finding.value,
                        finding.threshold,
                    ),
                )
            } else {
                (
                    finding.severity,
                    format!(
                        "{} {:.1} {unit} exceeds threshold {:.1} {unit}",
                        label(finding.parameter),
                        finding.value,
                        finding.threshold,
                    ),
                )
            };
            push(severity, finding.parameter.as_str(), message, Some(finding.value));
        }

        for (parameter, value) in hazard::advisories(weather) {
            waypoint.warnings.push(waypoint_note(parameter, value));
            if assessment.findings.iter().any(|f| f.parameter == parameter) {
                continue;
            }
            push(
                WarningSeverity::Info,
                parameter.as_str(),
                format!(
                    "Rough conditions: {} {:.1} {}",
                    parameter.as_str(),
                    value,
                    parameter.unit()
                ),
                Some(value),
            );
        }

        for parameter in &assessment.missing {
            push(
                WarningSeverity::Info,
                parameter.as_str(),
                format!("No {} data", parameter.as_str()),
                None,
            );
        }
    }
}
