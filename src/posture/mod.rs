// Posture module - tilt/balance evaluation and threshold selection
//
// This module provides the pure computation at the heart of the backend:
// 1. Thresholds: warning/danger limits plus assessment-based recommendations
// 2. evaluate: sensor sample + thresholds -> PostureStatus
//
// Nothing in here touches the record store; callers persist raw samples
// and look up the active thresholds before evaluating.

pub mod evaluator;
pub mod thresholds;


pub use evaluator::{
    alert_level, balance_ratio, evaluate, tilt_angle, tilt_direction, AlertLevel, PostureStatus,
    TiltDirection,
};
pub use thresholds::{recommend, MobilityLevel, Thresholds};
