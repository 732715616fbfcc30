// SensorSample - one immutable telemetry frame from the wearable
//
// Column names follow the device payload: imu_* angles in degrees from the
// inertial unit, fsr_* readings from the left/right force-sensing resistors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Record;
use crate::error::MonitorError;
use crate::posture::{self, PostureStatus, Thresholds};
use crate::store::Table;

/// Largest accepted pitch/roll magnitude in degrees
pub const MAX_TILT_DEGREES: f64 = 180.0;
/// Largest accepted heading magnitude in degrees
pub const MAX_YAW_DEGREES: f64 = 360.0;

/// Stored telemetry frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub device_id: String,
    /// Capture time reported by the device
    pub timestamp: DateTime<Utc>,
    pub imu_pitch: f64,
    pub imu_roll: f64,
    pub imu_yaw: f64,
    pub fsr_left: f64,
    pub fsr_right: f64,
}

impl Record for SensorSample {
    const TABLE: Table = Table::SensorReadings;
}

impl SensorSample {
    pub fn evaluate(&self, thresholds: &Thresholds) -> PostureStatus {
        posture::evaluate(
            self.imu_pitch,
            self.imu_roll,
            self.fsr_left,
            self.fsr_right,
            thresholds,
        )
    }
}

/// Ingestion payload posted by the device
#[derive(Debug, Clone, Deserialize)]
pub struct SensorReadingRequest {
    pub patient_id: Uuid,
    pub device_id: String,
    /// Falls back to the server receive time when the device omits it
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub imu_pitch: f64,
    pub imu_roll: f64,
    #[serde(default)]
    pub imu_yaw: f64,
    pub fsr_left: f64,
    pub fsr_right: f64,
}

impl SensorReadingRequest {
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.device_id.trim().is_empty() {
            return Err(MonitorError::validation("device_id must not be empty"));
        }
        for (name, value, limit) in [
            ("imu_pitch", self.imu_pitch, MAX_TILT_DEGREES),
            ("imu_roll", self.imu_roll, MAX_TILT_DEGREES),
            ("imu_yaw", self.imu_yaw, MAX_YAW_DEGREES),
        ] {
            if !value.is_finite() || value.abs() > limit {
                return Err(MonitorError::validation(format!(
                    "{} must be an angle within +/-{} degrees (got {})",
                    name, limit, value
                )));
            }
        }
        for (name, value) in [("fsr_left", self.fsr_left), ("fsr_right", self.fsr_right)] {
            if !value.is_finite() || value < 0.0 {
                return Err(MonitorError::validation(format!(
                    "{} must be a finite non-negative pressure (got {})",
                    name, value
                )));
            }
        }
        Ok(())
    }

    pub fn into_sample(self, received_at: DateTime<Utc>) -> SensorSample {
        SensorSample {
            id: Uuid::new_v4(),
            patient_id: self.patient_id,
            device_id: self.device_id,
            timestamp: self.timestamp.unwrap_or(received_at),
            imu_pitch: self.imu_pitch,
            imu_roll: self.imu_roll,
            imu_yaw: self.imu_yaw,
            fsr_left: self.fsr_left,
            fsr_right: self.fsr_right,
        }
    }
}
