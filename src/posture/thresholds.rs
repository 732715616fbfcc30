// Thresholds - warning/danger tilt limits and assessment-based recommendations
//
// A fresh patient starts at 8.0/15.0 degrees. The onboarding assessment
// (stroke severity and mobility aid) shifts the pair before the first
// calibration is saved.

use serde::{Deserialize, Serialize};

use crate::error::MonitorError;

pub const DEFAULT_WARNING_THRESHOLD: f64 = 8.0;
pub const DEFAULT_DANGER_THRESHOLD: f64 = 15.0;

/// Warning/danger tilt limits in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub warning: f64,
    pub danger: f64,
}

impl Thresholds {
    pub const DEFAULT: Thresholds = Thresholds {
        warning: DEFAULT_WARNING_THRESHOLD,
        danger: DEFAULT_DANGER_THRESHOLD,
    };

    pub fn new(warning: f64, danger: f64) -> Self {
        Self { warning, danger }
    }

    /// Both limits finite and positive, danger not below warning.
    pub fn validate(&self) -> Result<(), MonitorError> {
        if !self.warning.is_finite() || self.warning <= 0.0 {
            return Err(MonitorError::validation(format!(
                "warning_threshold must be a positive number (got {})",
                self.warning
            )));
        }
        if !self.danger.is_finite() || self.danger <= 0.0 {
            return Err(MonitorError::validation(format!(
                "danger_threshold must be a positive number (got {})",
                self.danger
            )));
        }
        if self.danger < self.warning {
            return Err(MonitorError::validation(format!(
                "danger_threshold {} is below warning_threshold {}",
                self.danger, self.warning
            )));
        }
        Ok(())
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Mobility aid reported during onboarding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MobilityLevel {
    Wheelchair,
    Walker,
    Cane,
    Independent,
}

impl MobilityLevel {
    /// Sensitivity multiplier applied to both thresholds
    fn multiplier(&self) -> f64 {
        match self {
            MobilityLevel::Wheelchair => 0.8,
            MobilityLevel::Walker => 0.9,
            MobilityLevel::Cane => 1.0,
            MobilityLevel::Independent => 1.1,
        }
    }
}

/// Recommend thresholds from the patient's assessment
///
/// Severity 1-2 tightens to 6/12, 3 keeps 8/15, 4-5 relaxes to 10/18.
/// The mobility multiplier is applied afterwards and both values are
/// rounded to one decimal place.
pub fn recommend(severity_level: Option<u8>, mobility: Option<MobilityLevel>) -> Thresholds {
    let (warning, danger) = match severity_level {
        Some(1) | Some(2) => (6.0, 12.0),
        Some(4) | Some(5) => (10.0, 18.0),
        _ => (DEFAULT_WARNING_THRESHOLD, DEFAULT_DANGER_THRESHOLD),
    };
    let factor = mobility.map(|m| m.multiplier()).unwrap_or(1.0);

    Thresholds {
        warning: round_tenth(warning * factor),
        danger: round_tenth(danger * factor),
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let thresholds = Thresholds::default();
        assert_eq!(thresholds.warning, 8.0);
        assert_eq!(thresholds.danger, 15.0);
        assert!(thresholds.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_pair() {
        let err = Thresholds::new(12.0, 10.0).validate().unwrap_err();
        assert!(err.to_string().contains("below warning_threshold"));
    }

    #[test]
    fn test_validate_rejects_non_positive_and_nan() {
        assert!(Thresholds::new(0.0, 10.0).validate().is_err());
        assert!(Thresholds::new(5.0, -1.0).validate().is_err());
        assert!(Thresholds::new(f64::NAN, 10.0).validate().is_err());
        assert!(Thresholds::new(5.0, f64::INFINITY).validate().is_err());
    }

    #[test]
    fn test_validate_accepts_equal_pair() {
        assert!(Thresholds::new(10.0, 10.0).validate().is_ok());
    }

    #[test]
    fn test_recommend_by_severity() {
        assert_eq!(recommend(Some(1), None), Thresholds::new(6.0, 12.0));
        assert_eq!(recommend(Some(3), None), Thresholds::new(8.0, 15.0));
        assert_eq!(recommend(Some(5), None), Thresholds::new(10.0, 18.0));
        assert_eq!(recommend(None, None), Thresholds::DEFAULT);
    }

    #[test]
    fn test_recommend_applies_mobility_and_rounds() {
        // 6.0 * 0.8 = 4.8, 12.0 * 0.8 = 9.6
        assert_eq!(
            recommend(Some(2), Some(MobilityLevel::Wheelchair)),
            Thresholds::new(4.8, 9.6)
        );
        // 8.0 * 1.1 = 8.8, 15.0 * 1.1 = 16.5
        assert_eq!(
            recommend(Some(3), Some(MobilityLevel::Independent)),
            Thresholds::new(8.8, 16.5)
        );
        // 10.0 * 0.9 = 9.0, 18.0 * 0.9 = 16.2
        assert_eq!(
            recommend(Some(4), Some(MobilityLevel::Walker)),
            Thresholds::new(9.0, 16.2)
        );
        assert_eq!(
            recommend(None, Some(MobilityLevel::Cane)),
            Thresholds::DEFAULT
        );
    }
}
