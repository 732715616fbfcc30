//! Monitoring telemetry collector and helpers.
//!
//! The collector multiplexes evaluation, calibration, session and error
//! events into a bounded history that `/metrics` reads. Alert counters are
//! kept separately so totals survive history eviction.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::error::ErrorCode;
use crate::posture::{AlertLevel, PostureStatus};

pub mod events;

pub use events::MetricEvent;

/// Global telemetry hub shared across the crate.
static HUB: Lazy<TelemetryHub> = Lazy::new(TelemetryHub::default);

/// Access the global telemetry hub.
pub fn hub() -> &'static TelemetryHub {
    &HUB
}

/// Snapshot of collector state for HTTP reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<MetricEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
    /// Evaluations per alert level since startup
    pub alert_counts: BTreeMap<String, u64>,
}

/// Collector retaining a bounded history of metrics.
pub struct TelemetryCollector {
    history: Mutex<VecDeque<MetricEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: MetricEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut history) = self.history.lock() {
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            history.push_back(event);
        }
    }

    fn recent(&self) -> Vec<MetricEvent> {
        self.history
            .lock()
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn total_events(&self) -> u64 {
        self.total_events.load(Ordering::Relaxed)
    }

    fn dropped_events(&self) -> u64 {
        self.dropped_history.load(Ordering::Relaxed)
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Rolling window of tilt magnitudes to compute avg/max tilt.
struct TiltTracker {
    samples: VecDeque<f64>,
    max_samples: usize,
}

impl TiltTracker {
    fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    fn observe(&mut self, value: f64) -> (f64, f64, usize) {
        if self.samples.len() == self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(value.abs());

        let count = self.samples.len();
        let sum: f64 = self.samples.iter().copied().sum();
        let max = self
            .samples
            .iter()
            .copied()
            .fold(0.0_f64, |acc, next| acc.max(next));
        let avg = if count == 0 { 0.0 } else { sum / count as f64 };
        (avg, max, count)
    }
}

/// Top-level hub wrapping collector state plus derived counters.
pub struct TelemetryHub {
    collector: TelemetryCollector,
    tilt: Mutex<TiltTracker>,
    alert_counts: Mutex<HashMap<AlertLevel, u64>>,
}

impl TelemetryHub {
    pub fn new(history_capacity: usize, tilt_window: usize) -> Self {
        Self {
            collector: TelemetryCollector::new(history_capacity),
            tilt: Mutex::new(TiltTracker::new(tilt_window)),
            alert_counts: Mutex::new(HashMap::new()),
        }
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            recent: self.collector.recent(),
            total_events: self.collector.total_events(),
            dropped_events: self.collector.dropped_events(),
            alert_counts: self
                .alert_counts
                .lock()
                .map(|counts| {
                    counts
                        .iter()
                        .map(|(level, count)| (level.as_str().to_string(), *count))
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    pub fn record_evaluation(&self, status: &PostureStatus) {
        self.collector.publish(MetricEvent::Evaluation {
            alert_level: status.alert_level,
            tilt_angle: status.tilt_angle,
            haptic_active: status.haptic_active,
        });

        if let Ok(mut counts) = self.alert_counts.lock() {
            *counts.entry(status.alert_level).or_insert(0) += 1;
        }

        let window = self
            .tilt
            .lock()
            .ok()
            .map(|mut tracker| tracker.observe(status.tilt_angle));

        if let Some((avg, max, count)) = window {
            self.collector.publish(MetricEvent::TiltWindow {
                avg_deg: avg,
                max_deg: max,
                sample_count: count,
            });
        }
    }

    pub fn record_calibration(&self, patient_id: impl ToString, warning: f64, danger: f64) {
        self.collector.publish(MetricEvent::CalibrationActivated {
            patient_id: patient_id.to_string(),
            warning_threshold: warning,
            danger_threshold: danger,
        });
    }

    pub fn record_session_stop(
        &self,
        session_id: impl ToString,
        recomputed: bool,
        upright_percentage: f64,
    ) {
        self.collector.publish(MetricEvent::SessionStopped {
            session_id: session_id.to_string(),
            recomputed,
            upright_percentage,
        });
    }

    pub fn record_error(&self, err: &dyn ErrorCode, context: impl Into<String>) {
        self.collector.publish(MetricEvent::Error {
            code: err.code(),
            context: context.into(),
        });
    }
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new(64, 32)
    }
}
