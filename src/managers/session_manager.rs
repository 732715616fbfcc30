// SessionManager: therapy session lifecycle and analytics summaries
//
// A session is stopped exactly once. Stop recomputes the summary from the
// samples captured inside [start_time, end_time] and only falls back to the
// caller's numbers when the window holds no samples.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{find_by_id, CalibrationManager};
use crate::error::{log_monitor_error, MonitorError};
use crate::records::{
    from_row, from_rows, to_row, MonitoringSession, Patient, Record, SensorSample, SessionSummary,
    StopSessionRequest,
};
use crate::store::{Filter, OrderBy, Query, RecordStore};
use crate::telemetry;

/// Upright-percentage delta (points) separating a trend from noise
const TREND_DELTA_POINTS: f64 = 5.0;

/// Direction of upright percentage across recent sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
    InsufficientData,
}

impl Trend {
    /// Compare the newer half of `upright` (oldest first) against the older half
    fn classify(upright: &[f64]) -> (Self, Option<f64>) {
        if upright.len() < 2 {
            return (Trend::InsufficientData, None);
        }
        let (older, newer) = upright.split_at(upright.len() / 2);
        let delta = mean(newer) - mean(older);
        let trend = if delta > TREND_DELTA_POINTS {
            Trend::Improving
        } else if delta < -TREND_DELTA_POINTS {
            Trend::Declining
        } else {
            Trend::Stable
        };
        (trend, Some(delta))
    }
}

/// Aggregate over a patient's most recent completed sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub session_count: usize,
    pub average_upright_percentage: f64,
    pub average_duration_minutes: f64,
    pub total_corrections: u64,
    pub trend: Trend,
    /// Newer-half minus older-half mean upright percentage
    pub upright_delta: Option<f64>,
}

pub struct SessionManager {
    store: Arc<dyn RecordStore>,
    calibration: Arc<CalibrationManager>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn RecordStore>, calibration: Arc<CalibrationManager>) -> Self {
        Self { store, calibration }
    }

    pub fn start(&self, patient_id: Uuid) -> Result<MonitoringSession, MonitorError> {
        if find_by_id::<Patient>(self.store.as_ref(), patient_id)?.is_none() {
            let err = MonitorError::not_found("Patient", patient_id);
            log_monitor_error(&err, "start_session");
            return Err(err);
        }

        let session = MonitoringSession::start(patient_id, Utc::now());
        let row = self.store.insert(MonitoringSession::TABLE, to_row(&session)?)?;
        log::info!(
            "[SessionManager] Started session {} for patient {}",
            session.id,
            patient_id
        );
        Ok(from_row(row)?)
    }

    /// Complete a running session
    ///
    /// # Errors
    /// - `NotFound` when the session does not exist
    /// - `Validation` when the session is already stopped, or when the
    ///   window holds no samples and the caller summary is incomplete or
    ///   out of range
    pub fn stop(
        &self,
        session_id: Uuid,
        request: StopSessionRequest,
    ) -> Result<MonitoringSession, MonitorError> {
        let session = find_by_id::<MonitoringSession>(self.store.as_ref(), session_id)?
            .ok_or_else(|| MonitorError::not_found("Session", session_id))
            .inspect_err(|err| log_monitor_error(err, "stop_session"))?;

        if session.is_complete() {
            let err = already_stopped(session_id);
            log_monitor_error(&err, "stop_session");
            return Err(err);
        }

        let end_time = Utc::now();
        let measured_minutes = minutes_between(session.start_time, end_time);
        let samples = self.samples_between(session.patient_id, session.start_time, end_time)?;
        let thresholds = self.calibration.thresholds_for(session.patient_id)?;

        let (summary, recomputed) =
            match SessionSummary::from_samples(&samples, &thresholds, measured_minutes) {
                Some(summary) => (summary, true),
                None => (
                    request
                        .into_summary(measured_minutes)
                        .inspect_err(|err| log_monitor_error(err, "stop_session"))?,
                    false,
                ),
            };

        let completed = MonitoringSession {
            end_time: Some(end_time),
            duration_minutes: Some(summary.duration_minutes),
            upright_percentage: Some(summary.upright_percentage),
            average_tilt: Some(summary.average_tilt),
            correction_count: Some(summary.correction_count),
            ..session
        };

        // Conditional on end_time still being null so a concurrent stop
        // cannot overwrite a completed session.
        let running = Filter::new()
            .eq("id", session_id.to_string())
            .eq("end_time", Value::Null);
        let updated = self
            .store
            .update(MonitoringSession::TABLE, &running, &to_row(&completed)?)?;

        let row = match updated.into_iter().next() {
            Some(row) => row,
            None => {
                let err = already_stopped(session_id);
                log_monitor_error(&err, "stop_session");
                return Err(err);
            }
        };

        log::info!(
            "[SessionManager] Stopped session {} ({} samples, recomputed={})",
            session_id,
            samples.len(),
            recomputed
        );
        telemetry::hub().record_session_stop(session_id, recomputed, summary.upright_percentage);

        Ok(from_row(row)?)
    }

    /// Sessions for the patient, newest first
    pub fn history(
        &self,
        patient_id: Uuid,
        limit: usize,
    ) -> Result<Vec<MonitoringSession>, MonitorError> {
        let rows = self.store.select(
            MonitoringSession::TABLE,
            &Query::new(Filter::new().eq("patient_id", patient_id.to_string()))
                .order_by(OrderBy::desc("start_time"))
                .limit(limit),
        )?;
        Ok(from_rows(rows)?)
    }

    /// Summary over the most recent `limit` completed sessions
    ///
    /// Returns `Ok(None)` when the patient has no completed sessions.
    pub fn summarize(
        &self,
        patient_id: Uuid,
        limit: usize,
    ) -> Result<Option<AnalyticsSummary>, MonitorError> {
        let rows = self.store.select(
            MonitoringSession::TABLE,
            &Query::new(Filter::new().eq("patient_id", patient_id.to_string()))
                .order_by(OrderBy::desc("start_time")),
        )?;
        let sessions: Vec<MonitoringSession> = from_rows(rows)?;

        let mut summaries: Vec<SessionSummary> = sessions
            .iter()
            .filter_map(MonitoringSession::summary)
            .take(limit)
            .collect();
        if summaries.is_empty() {
            return Ok(None);
        }
        summaries.reverse();

        let upright: Vec<f64> = summaries.iter().map(|s| s.upright_percentage).collect();
        let durations: Vec<f64> = summaries.iter().map(|s| s.duration_minutes).collect();
        let (trend, upright_delta) = Trend::classify(&upright);

        Ok(Some(AnalyticsSummary {
            session_count: summaries.len(),
            average_upright_percentage: mean(&upright),
            average_duration_minutes: mean(&durations),
            total_corrections: summaries.iter().map(|s| u64::from(s.correction_count)).sum(),
            trend,
            upright_delta,
        }))
    }

    fn samples_between(
        &self,
        patient_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SensorSample>, MonitorError> {
        let rows = self.store.select(
            SensorSample::TABLE,
            &Query::new(Filter::new().eq("patient_id", patient_id.to_string()))
                .order_by(OrderBy::asc("timestamp")),
        )?;
        let samples: Vec<SensorSample> = from_rows(rows)?;
        Ok(samples
            .into_iter()
            .filter(|s| s.timestamp >= start && s.timestamp <= end)
            .collect())
    }
}

fn already_stopped(session_id: Uuid) -> MonitorError {
    MonitorError::validation(format!("session {} is already stopped", session_id))
}

fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    ((end - start).num_milliseconds().max(0) as f64) / 60_000.0
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
