// Evaluator - rule-based posture classification
//
// Turns one telemetry frame (IMU pitch/roll, left/right FSR pressure) into a
// PostureStatus using the patient's warning/danger thresholds.
//
// Alert rules are evaluated in priority order with strict comparisons:
// 1. tilt > danger  -> Unsafe
// 2. tilt > warning -> Warning
// 3. otherwise      -> Safe

use serde::{Deserialize, Serialize};

use super::thresholds::Thresholds;

/// Three-tier posture safety classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Safe,
    Warning,
    Unsafe,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Safe => "safe",
            AlertLevel::Warning => "warning",
            AlertLevel::Unsafe => "unsafe",
        }
    }
}

/// Dominant lean direction of the trunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TiltDirection {
    Forward,
    Backward,
    Left,
    Right,
}

/// Derived posture status for a single sample
///
/// Computed fresh on every evaluation and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PostureStatus {
    /// Magnitude of the (pitch, roll) lean vector in degrees
    pub tilt_angle: f64,
    pub tilt_direction: TiltDirection,
    pub alert_level: AlertLevel,
    /// Signed weight shift in [-1, 1]; positive means shifted right
    pub balance: f64,
    /// Whether the device should drive haptic feedback
    pub haptic_active: bool,
}

impl PostureStatus {
    pub fn is_upright(&self) -> bool {
        self.alert_level == AlertLevel::Safe
    }
}

/// Evaluate one sample against a threshold pair
///
/// Pure and total over finite inputs.
///
/// # Arguments
/// * `pitch` - Forward/backward lean in degrees (positive = forward)
/// * `roll` - Sideways lean in degrees (negative = left)
/// * `left_pressure` - Left FSR reading
/// * `right_pressure` - Right FSR reading
/// * `thresholds` - Active warning/danger pair
pub fn evaluate(
    pitch: f64,
    roll: f64,
    left_pressure: f64,
    right_pressure: f64,
    thresholds: &Thresholds,
) -> PostureStatus {
    let tilt = tilt_angle(pitch, roll);
    let alert = alert_level(tilt, thresholds);

    PostureStatus {
        tilt_angle: tilt,
        tilt_direction: tilt_direction(pitch, roll),
        alert_level: alert,
        balance: balance_ratio(left_pressure, right_pressure),
        haptic_active: alert != AlertLevel::Safe,
    }
}

/// Euclidean magnitude of the lean vector; sign information is discarded.
pub fn tilt_angle(pitch: f64, roll: f64) -> f64 {
    pitch.hypot(roll)
}

/// `(right - left) / (right + left)`, or `0.0` when both sensors read zero
/// (device lifted off the patient).
pub fn balance_ratio(left_pressure: f64, right_pressure: f64) -> f64 {
    let total = left_pressure + right_pressure;
    if total == 0.0 {
        0.0
    } else if total.is_finite() {
        (right_pressure - left_pressure) / total
    } else {
        // Halve both readings so the sum stays representable.
        let (left, right) = (left_pressure * 0.5, right_pressure * 0.5);
        (right - left) / (right + left)
    }
}

/// Classify a tilt magnitude. Values exactly on a threshold fall through to
/// the safer level.
pub fn alert_level(tilt_angle: f64, thresholds: &Thresholds) -> AlertLevel {
    if tilt_angle > thresholds.danger {
        AlertLevel::Unsafe
    } else if tilt_angle > thresholds.warning {
        AlertLevel::Warning
    } else {
        AlertLevel::Safe
    }
}

/// Pick the axis with the larger absolute angle; ties go to the pitch axis.
pub fn tilt_direction(pitch: f64, roll: f64) -> TiltDirection {
    if roll.abs() > pitch.abs() {
        if roll < 0.0 {
            TiltDirection::Left
        } else {
            TiltDirection::Right
        }
    } else if pitch > 0.0 {
        TiltDirection::Forward
    } else {
        TiltDirection::Backward
    }
}
