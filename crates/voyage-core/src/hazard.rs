//! Hazard evaluation of weather snapshots against per-request thresholds.

use serde::{Deserialize, Serialize};

use crate::models::{RouteRequest, WarningSeverity, WeatherSnapshot};

/// Multiplier on a threshold above which a reading is `danger`.
pub const DEFAULT_DANGER_RATIO: f64 = 1.5;

/// Rough-weather tiers reported as advisories even below the request thresholds.
pub const ADVISORY_WIND_KN: f64 = 20.0;
pub const ADVISORY_WAVE_M: f64 = 3.0;

/// Thresholds for one planning request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardThresholds {
    /// Wind speed in knots
    pub wind_kn: f64,
    /// Significant wave height in meters
    pub wave_m: f64,
    pub danger_ratio: f64,
}

impl Default for HazardThresholds {
    fn default() -> Self {
        Self {
            wind_kn: crate::models::DEFAULT_WIND_THRESHOLD_KN,
            wave_m: crate::models::DEFAULT_WAVE_THRESHOLD_M,
            danger_ratio: DEFAULT_DANGER_RATIO,
        }
    }
}

impl HazardThresholds {
    pub fn from_request(request: &RouteRequest, danger_ratio: f64) -> Self {
        Self {
            wind_kn: request.extreme_wind_threshold,
            wave_m: request.extreme_wave_threshold,
            danger_ratio: if danger_ratio.is_finite() && danger_ratio >= 1.0 {
                danger_ratio
            } else {
                DEFAULT_DANGER_RATIO
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HazardParameter {
    Wind,
    Waves,
}

impl HazardParameter {
    pub fn as_str(&self) -> &'static str {
        match self {
            HazardParameter::Wind => "wind",
            HazardParameter::Waves => "waves",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            HazardParameter::Wind => "kts",
            HazardParameter::Waves => "m",
        }
    }

    fn reading(&self, snapshot: &WeatherSnapshot) -> Option<f64> {
        match self {
            HazardParameter::Wind => snapshot.wind_speed,
            HazardParameter::Waves => snapshot.wave_height,
        }
    }

    fn threshold(&self, thresholds: &HazardThresholds) -> f64 {
        match self {
            HazardParameter::Wind => thresholds.wind_kn,
            HazardParameter::Waves => thresholds.wave_m,
        }
    }

    pub fn advisory(&self) -> f64 {
        match self {
            HazardParameter::Wind => ADVISORY_WIND_KN,
            HazardParameter::Waves => ADVISORY_WAVE_M,
        }
    }
}

pub const PARAMETERS: [HazardParameter; 2] = [HazardParameter::Wind, HazardParameter::Waves];

/// One parameter exceeding its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardFinding {
    pub parameter: HazardParameter,
    pub value: f64,
    pub threshold: f64,
    pub severity: WarningSeverity,
}

/// Result of evaluating one snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HazardAssessment {
    /// Exceeded thresholds, most severe first
    pub findings: Vec<HazardFinding>,
    /// Parameters that could not be evaluated
    pub missing: Vec<HazardParameter>,
}

impl HazardAssessment {
    pub fn severity(&self) -> WarningSeverity {
        self.findings
            .iter()
            .map(|f| f.severity)
            .max()
            .unwrap_or(WarningSeverity::Info)
    }

    pub fn is_hazardous(&self) -> bool {
        !self.findings.is_empty()
    }

    pub fn worst(&self) -> Option<&HazardFinding> {
        self.findings.first()
    }

    pub fn has_no_data(&self) -> bool {
        self.missing.len() == PARAMETERS.len()
    }
}

fn grade(value: f64, threshold: f64, ratio: f64) -> Option<WarningSeverity> {
    if !value.is_finite() {
        return None;
    }
    if value > threshold * ratio {
        Some(WarningSeverity::Danger)
    } else if value > threshold {
        Some(WarningSeverity::Warning)
    } else {
        None
    }
}

/// Evaluate a snapshot. A missing snapshot is a "no data" assessment, never a hazard.
pub fn assess(snapshot: Option<&WeatherSnapshot>, thresholds: &HazardThresholds) -> HazardAssessment {
    let Some(snapshot) = snapshot else {
        return HazardAssessment {
            findings: Vec::new(),
            missing: PARAMETERS.to_vec(),
        };
    };

    let mut assessment = HazardAssessment::default();
    for parameter in PARAMETERS {
        let Some(value) = parameter.reading(snapshot) else {
            assessment.missing.push(parameter);
            continue;
        };
        let threshold = parameter.threshold(thresholds);
        if let Some(severity) = grade(value, threshold, thresholds.danger_ratio) {
            assessment.findings.push(HazardFinding {
                parameter,
                value,
                threshold,
                severity,
            });
        }
    }
    // Stable sort keeps wind ahead of waves at equal severity.
    assessment.findings.sort_by(|a, b| b.severity.cmp(&a.severity));
    assessment
}

/// Overall severity of a snapshot: `danger` beyond the danger margin,
/// `warning` above any threshold, `info` otherwise (including missing data).
pub fn classify(snapshot: &WeatherSnapshot, thresholds: &HazardThresholds) -> WarningSeverity {
    assess(Some(snapshot), thresholds).severity()
}

pub fn is_hazardous(snapshot: Option<&WeatherSnapshot>, thresholds: &HazardThresholds) -> bool {
    assess(snapshot, thresholds).is_hazardous()
}

/// Readings at or above the advisory tier, regardless of request thresholds.
pub fn advisories(snapshot: &WeatherSnapshot) -> Vec<(HazardParameter, f64)> {
    PARAMETERS
        .iter()
        .filter_map(|parameter| {
            let value = parameter.reading(snapshot)?;
            (value >= parameter.advisory()).then_some((*parameter, value))
        })
        .collect()
}

/// Weather penalty in [0, 2]; zero for calm conditions.
pub fn penalty(snapshot: &WeatherSnapshot) -> f64 {
    let mut score = 0.0;
    if let Some(wind) = snapshot.wind_speed.filter(|w| *w > 15.0) {
        score += (wind - 15.0) / 30.0;
    }
    if let Some(wave) = snapshot.wave_height.filter(|h| *h > 2.0) {
        score += (wave - 2.0) / 5.0;
    }
    score.min(2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(wind: Option<f64>, wave: Option<f64>) -> WeatherSnapshot {
        WeatherSnapshot {
            wind_speed: wind,
            wave_height: wave,
            ..Default::default()
        }
    }

    #[test]
    fn classify_grades_by_margin() {
        let t = HazardThresholds::default();
        assert_eq!(classify(&snapshot(Some(10.0), Some(1.0)), &t), WarningSeverity::Info);
        assert_eq!(classify(&snapshot(Some(30.0), None), &t), WarningSeverity::Info);
        assert_eq!(classify(&snapshot(Some(35.0), None), &t), WarningSeverity::Warning);
        assert_eq!(classify(&snapshot(Some(46.0), None), &t), WarningSeverity::Danger);
        assert_eq!(classify(&snapshot(Some(5.0), Some(8.0)), &t), WarningSeverity::Danger);
    }

    #[test]
    fn missing_fields_are_recorded_not_hazardous() {
        let t = HazardThresholds::default();
        let a = assess(Some(&snapshot(None, Some(6.0))), &t);
        assert_eq!(a.missing, vec![HazardParameter::Wind]);
        assert_eq!(a.findings.len(), 1);
        assert_eq!(a.findings[0].parameter, HazardParameter::Waves);

        let none = assess(None, &t);
        assert!(!none.is_hazardous());
        assert!(none.has_no_data());
    }

    #[test]
    fn findings_are_ordered_most_severe_first() {
        let t = HazardThresholds::default();
        let a = assess(Some(&snapshot(Some(32.0), Some(9.0))), &t);
        assert_eq!(a.findings.len(), 2);
        assert_eq!(a.worst().map(|f| f.parameter), Some(HazardParameter::Waves));
        assert_eq!(a.severity(), WarningSeverity::Danger);
    }

    #[test]
    fn thresholds_come_from_the_request() {
        let mut request = RouteRequest::new(
            crate::models::Coordinate::new(0.0, 0.0),
            crate::models::Coordinate::new(1.0, 1.0),
            chrono::Utc::now(),
        );
        request.extreme_wind_threshold = 20.0;
        let t = HazardThresholds::from_request(&request, 0.5);
        assert_eq!(t.wind_kn, 20.0);
        assert_eq!(t.danger_ratio, DEFAULT_DANGER_RATIO);
        assert!(is_hazardous(Some(&snapshot(Some(25.0), None)), &t));
    }

    #[test]
    fn advisory_tier_is_inclusive() {
        let found = advisories(&snapshot(Some(20.0), Some(2.9)));
        assert_eq!(found, vec![(HazardParameter::Wind, 20.0)]);
    }

    #[test]
    fn penalty_is_zero_when_calm_and_capped() {
        assert_eq!(penalty(&snapshot(Some(10.0), Some(1.0))), 0.0);
        assert_eq!(penalty(&WeatherSnapshot::default()), 0.0);
        assert!((penalty(&snapshot(Some(30.0), Some(4.0))) - 0.9).abs() < 1e-9);
        assert_eq!(penalty(&snapshot(Some(90.0), Some(15.0))), 2.0);
    }
}
