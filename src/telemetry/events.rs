//! Core telemetry event types describing monitoring activity exposed on the
//! `/health` and `/metrics` surfaces.

use serde::{Deserialize, Serialize};

use crate::posture::AlertLevel;

/// Rich metric events covering evaluations, calibration and session activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    Evaluation {
        alert_level: AlertLevel,
        tilt_angle: f64,
        haptic_active: bool,
    },
    TiltWindow {
        avg_deg: f64,
        max_deg: f64,
        sample_count: usize,
    },
    CalibrationActivated {
        patient_id: String,
        warning_threshold: f64,
        danger_threshold: f64,
    },
    SessionStopped {
        session_id: String,
        recomputed: bool,
        upright_percentage: f64,
    },
    Error {
        code: i32,
        context: String,
    },
}
