// CalibrationProfile - per-patient baseline orientation and tilt thresholds
//
// Profiles are never deleted. A new calibration deactivates the previous
// one so that at most one profile per patient carries is_active = true.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Record;
use crate::error::MonitorError;
use crate::posture::Thresholds;
use crate::store::Table;

/// Stored calibration profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    pub id: Uuid,
    pub patient_id: Uuid,
    /// Creation timestamp; newest active profile wins
    pub calibration_date: DateTime<Utc>,
    /// Neutral pitch in degrees
    pub baseline_pitch: f64,
    /// Neutral roll in degrees
    pub baseline_roll: f64,
    pub warning_threshold: f64,
    pub danger_threshold: f64,
    pub is_active: bool,
}

impl Record for CalibrationProfile {
    const TABLE: Table = Table::DeviceCalibrations;
}

impl CalibrationProfile {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(self.warning_threshold, self.danger_threshold)
    }
}

/// Calibration submission
///
/// Thresholds may be omitted, in which case they are recommended from the
/// patient's assessment.
#[derive(Debug, Clone, Deserialize)]
pub struct CalibrationRequest {
    pub patient_id: Uuid,
    #[serde(default)]
    pub baseline_pitch: f64,
    #[serde(default)]
    pub baseline_roll: f64,
    #[serde(default)]
    pub warning_threshold: Option<f64>,
    #[serde(default)]
    pub danger_threshold: Option<f64>,
}

impl CalibrationRequest {
    pub fn new(patient_id: Uuid, thresholds: Thresholds) -> Self {
        Self {
            patient_id,
            baseline_pitch: 0.0,
            baseline_roll: 0.0,
            warning_threshold: Some(thresholds.warning),
            danger_threshold: Some(thresholds.danger),
        }
    }

    /// Thresholds supplied by the caller, filling gaps from `fallback`.
    pub fn thresholds_or(&self, fallback: Thresholds) -> Thresholds {
        Thresholds::new(
            self.warning_threshold.unwrap_or(fallback.warning),
            self.danger_threshold.unwrap_or(fallback.danger),
        )
    }

    pub fn has_explicit_thresholds(&self) -> bool {
        self.warning_threshold.is_some() && self.danger_threshold.is_some()
    }

    /// Build the active profile for this request. Validates thresholds and
    /// baselines.
    pub fn into_profile(
        self,
        thresholds: Thresholds,
        created_at: DateTime<Utc>,
    ) -> Result<CalibrationProfile, MonitorError> {
        thresholds.validate()?;
        if !self.baseline_pitch.is_finite() || !self.baseline_roll.is_finite() {
            return Err(MonitorError::validation(
                "baseline_pitch and baseline_roll must be finite",
            ));
        }

        Ok(CalibrationProfile {
            id: Uuid::new_v4(),
            patient_id: self.patient_id,
            calibration_date: created_at,
            baseline_pitch: self.baseline_pitch,
            baseline_roll: self.baseline_roll,
            warning_threshold: thresholds.warning,
            danger_threshold: thresholds.danger,
            is_active: true,
        })
    }
}
