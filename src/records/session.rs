// MonitoringSession - one therapy session and its summary statistics
//
// Sessions are created on start and completed exactly once on stop; the
// summary columns stay null until then.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Record, SensorSample};
use crate::error::MonitorError;
use crate::posture::Thresholds;
use crate::store::Table;

/// Stored monitoring session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringSession {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_minutes: Option<f64>,
    #[serde(default)]
    pub upright_percentage: Option<f64>,
    #[serde(default)]
    pub average_tilt: Option<f64>,
    #[serde(default)]
    pub correction_count: Option<u32>,
}

impl Record for MonitoringSession {
    const TABLE: Table = Table::MonitoringSessions;
}

impl MonitoringSession {
    pub fn start(patient_id: Uuid, start_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            start_time,
            end_time: None,
            duration_minutes: None,
            upright_percentage: None,
            average_tilt: None,
            correction_count: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.end_time.is_some()
    }

    /// Summary of a completed session, `None` while still running.
    pub fn summary(&self) -> Option<SessionSummary> {
        Some(SessionSummary {
            duration_minutes: self.duration_minutes?,
            upright_percentage: self.upright_percentage?,
            average_tilt: self.average_tilt?,
            correction_count: self.correction_count?,
        })
    }
}

/// Summary columns written when a session stops
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub duration_minutes: f64,
    pub upright_percentage: f64,
    pub average_tilt: f64,
    pub correction_count: u32,
}

impl SessionSummary {
    /// Recompute the summary from the samples recorded in the session window
    ///
    /// * upright percentage - share of samples classified safe
    /// * average tilt - mean tilt magnitude
    /// * corrections - transitions from a non-safe sample to a safe one
    ///
    /// Returns `None` when `samples` is empty.
    pub fn from_samples(
        samples: &[SensorSample],
        thresholds: &Thresholds,
        duration_minutes: f64,
    ) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut upright = 0usize;
        let mut tilt_sum = 0.0;
        let mut corrections = 0u32;
        let mut previous_upright: Option<bool> = None;

        for sample in samples {
            let status = sample.evaluate(thresholds);
            let is_upright = status.is_upright();
            if is_upright {
                upright += 1;
            }
            if previous_upright == Some(false) && is_upright {
                corrections += 1;
            }
            previous_upright = Some(is_upright);
            tilt_sum += status.tilt_angle;
        }

        let count = samples.len() as f64;
        Some(Self {
            duration_minutes,
            upright_percentage: upright as f64 / count * 100.0,
            average_tilt: tilt_sum / count,
            correction_count: corrections,
        })
    }
}

/// Stop payload; every field is optional
///
/// Caller-supplied values are only used when the session has no stored
/// samples to recompute from.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StopSessionRequest {
    #[serde(default)]
    pub duration_minutes: Option<f64>,
    #[serde(default)]
    pub upright_percentage: Option<f64>,
    #[serde(default)]
    pub average_tilt: Option<f64>,
    #[serde(default)]
    pub correction_count: Option<u32>,
}

impl StopSessionRequest {
    /// Validate the caller-supplied summary, defaulting the duration to the
    /// measured wall-clock duration.
    pub fn into_summary(self, measured_minutes: f64) -> Result<SessionSummary, MonitorError> {
        let (upright_percentage, average_tilt, correction_count) =
            match (self.upright_percentage, self.average_tilt, self.correction_count) {
                (Some(upright), Some(tilt), Some(count)) => (upright, tilt, count),
                _ => {
                    return Err(MonitorError::validation(
                        "no samples recorded during session; upright_percentage, \
                         average_tilt and correction_count are required",
                    ))
                }
            };
        let duration_minutes = self.duration_minutes.unwrap_or(measured_minutes);

        if !upright_percentage.is_finite() || !(0.0..=100.0).contains(&upright_percentage) {
            return Err(MonitorError::validation(format!(
                "upright_percentage must be within [0, 100] (got {})",
                upright_percentage
            )));
        }
        for (name, value) in [
            ("average_tilt", average_tilt),
            ("duration_minutes", duration_minutes),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(MonitorError::validation(format!(
                    "{} must be a finite non-negative number (got {})",
                    name, value
                )));
            }
        }

        Ok(SessionSummary {
            duration_minutes,
            upright_percentage,
            average_tilt,
            correction_count,
        })
    }
}
