// MonitoringManager: sample ingestion and live posture evaluation
//
// Control flow per sample: validate -> store raw sample -> look up the
// patient's active thresholds -> evaluate -> report status.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::{find_by_id, CalibrationManager};
use crate::error::{log_monitor_error, MonitorError};
use crate::posture::{PostureStatus, Thresholds};
use crate::records::{from_row, from_rows, to_row, Patient, Record, SensorReadingRequest, SensorSample};
use crate::store::{Filter, OrderBy, Query, RecordStore};
use crate::telemetry;

/// Result of evaluating one stored sample
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub sample: SensorSample,
    pub status: PostureStatus,
    pub thresholds: Thresholds,
}

/// Ingests device telemetry and evaluates posture
pub struct MonitoringManager {
    store: Arc<dyn RecordStore>,
    calibration: Arc<CalibrationManager>,
}

impl MonitoringManager {
    pub fn new(store: Arc<dyn RecordStore>, calibration: Arc<CalibrationManager>) -> Self {
        Self { store, calibration }
    }

    /// Store a sample and evaluate it against the patient's active thresholds
    ///
    /// # Errors
    /// - `Validation` for non-finite angles or negative/non-finite pressures
    /// - `NotFound` when the patient does not exist
    /// - `Store` when persisting the sample fails
    pub fn ingest(&self, request: SensorReadingRequest) -> Result<Evaluation, MonitorError> {
        request
            .validate()
            .inspect_err(|err| log_monitor_error(err, "ingest_sample"))?;

        let patient_id = request.patient_id;
        if find_by_id::<Patient>(self.store.as_ref(), patient_id)?.is_none() {
            let err = MonitorError::not_found("Patient", patient_id);
            log_monitor_error(&err, "ingest_sample");
            return Err(err);
        }

        let sample = request.into_sample(Utc::now());
        let row = self.store.insert(SensorSample::TABLE, to_row(&sample)?)?;
        let sample: SensorSample = from_row(row)?;

        self.evaluate_sample(sample)
    }

    /// Evaluate the patient's most recent stored sample
    ///
    /// # Errors
    /// - `NotFound` when the patient has no stored samples
    pub fn current(&self, patient_id: Uuid) -> Result<Evaluation, MonitorError> {
        let latest = self
            .recent(patient_id, 1)?
            .into_iter()
            .next()
            .ok_or_else(|| MonitorError::not_found("Sensor reading", patient_id))
            .inspect_err(|err| log_monitor_error(err, "current_status"))?;

        self.evaluate_sample(latest)
    }

    /// Stored samples for the patient, newest first
    pub fn recent(&self, patient_id: Uuid, limit: usize) -> Result<Vec<SensorSample>, MonitorError> {
        let rows = self.store.select(
            SensorSample::TABLE,
            &Query::new(Filter::new().eq("patient_id", patient_id.to_string()))
                .order_by(OrderBy::desc("timestamp"))
                .limit(limit),
        )?;
        Ok(from_rows(rows)?)
    }

    fn evaluate_sample(&self, sample: SensorSample) -> Result<Evaluation, MonitorError> {
        let thresholds = self.calibration.thresholds_for(sample.patient_id)?;
        let status = sample.evaluate(&thresholds);

        tracing::debug!(
            patient_id = %sample.patient_id,
            tilt = status.tilt_angle,
            alert = status.alert_level.as_str(),
            "posture evaluated"
        );
        if status.haptic_active {
            log::info!(
                "[MonitoringManager] {} alert for patient {} (tilt {:.1} deg)",
                status.alert_level.as_str(),
                sample.patient_id,
                status.tilt_angle
            );
        }
        telemetry::hub().record_evaluation(&status);

        Ok(Evaluation {
            sample,
            status,
            thresholds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::PatientManager;
    use crate::posture::{AlertLevel, TiltDirection};
    use crate::records::{CalibrationRequest, NewPatient};
    use crate::store::MemoryStore;
    use chrono::{DateTime, Duration};

    struct Fixture {
        patients: PatientManager,
        calibration: Arc<CalibrationManager>,
        monitoring: MonitoringManager,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let calibration = Arc::new(CalibrationManager::new(
            Arc::clone(&store),
            Thresholds::DEFAULT,
        ));
        Fixture {
            patients: PatientManager::new(Arc::clone(&store)),
            monitoring: MonitoringManager::new(store, Arc::clone(&calibration)),
            calibration,
        }
    }

    fn patient(fixture: &Fixture) -> Uuid {
        fixture
            .patients
            .create(NewPatient {
                full_name: "Monitor Patient".to_string(),
                ..NewPatient::default()
            })
            .unwrap()
            .id
    }

    fn reading(
        patient_id: Uuid,
        pitch: f64,
        roll: f64,
        left: f64,
        right: f64,
        timestamp: Option<DateTime<Utc>>,
    ) -> SensorReadingRequest {
        SensorReadingRequest {
            patient_id,
            device_id: "vest-01".to_string(),
            timestamp,
            imu_pitch: pitch,
            imu_roll: roll,
            imu_yaw: 0.0,
            fsr_left: left,
            fsr_right: right,
        }
    }

    #[test]
    fn test_uncalibrated_patient_uses_defaults() {
        let fixture = fixture();
        let patient_id = patient(&fixture);

        let evaluation = fixture
            .monitoring
            .ingest(reading(patient_id, 20.0, 0.0, 0.0, 0.0, None))
            .unwrap();

        assert_eq!(evaluation.thresholds, Thresholds::DEFAULT);
        assert_eq!(evaluation.status.alert_level, AlertLevel::Unsafe);
        assert_eq!(evaluation.status.balance, 0.0);
        assert!(evaluation.status.haptic_active);
    }

    #[test]
    fn test_active_calibration_drives_alerts() {
        let fixture = fixture();
        let patient_id = patient(&fixture);
        fixture
            .calibration
            .activate(CalibrationRequest::new(patient_id, Thresholds::new(4.0, 9.0)))
            .unwrap();

        let evaluation = fixture
            .monitoring
            .ingest(reading(patient_id, 0.0, -6.0, 300.0, 100.0, None))
            .unwrap();

        assert_eq!(evaluation.status.alert_level, AlertLevel::Warning);
        assert_eq!(evaluation.status.tilt_direction, TiltDirection::Left);
        assert_eq!(evaluation.status.balance, -0.5);
    }

    #[test]
    fn test_ingest_rejects_negative_pressure() {
        let fixture = fixture();
        let patient_id = patient(&fixture);
        let result = fixture
            .monitoring
            .ingest(reading(patient_id, 0.0, 0.0, -1.0, 0.0, None));
        assert!(matches!(result, Err(MonitorError::Validation { .. })));
        assert!(fixture.monitoring.recent(patient_id, 10).unwrap().is_empty());
    }

    #[test]
    fn test_ingest_rejects_out_of_range_angle() {
        let fixture = fixture();
        let patient_id = patient(&fixture);
        let result = fixture
            .monitoring
            .ingest(reading(patient_id, 1e200, 0.0, 1.0, 1.0, None));
        assert!(matches!(result, Err(MonitorError::Validation { .. })));
        assert!(fixture.monitoring.recent(patient_id, 10).unwrap().is_empty());
    }

    #[test]
    fn test_ingest_unknown_patient() {
        let fixture = fixture();
        let result = fixture
            .monitoring
            .ingest(reading(Uuid::new_v4(), 0.0, 0.0, 1.0, 1.0, None));
        assert!(matches!(result, Err(MonitorError::NotFound { .. })));
    }

    #[test]
    fn test_current_uses_latest_capture_time() {
        let fixture = fixture();
        let patient_id = patient(&fixture);
        let t0 = Utc::now();

        fixture
            .monitoring
            .ingest(reading(patient_id, 12.0, 0.0, 1.0, 1.0, Some(t0 + Duration::seconds(5))))
            .unwrap();
        // Arrives later but was captured earlier.
        fixture
            .monitoring
            .ingest(reading(patient_id, 1.0, 0.0, 1.0, 1.0, Some(t0)))
            .unwrap();

        let current = fixture.monitoring.current(patient_id).unwrap();
        assert_eq!(current.sample.imu_pitch, 12.0);
        assert_eq!(current.status.alert_level, AlertLevel::Warning);
    }

    #[test]
    fn test_current_without_samples() {
        let fixture = fixture();
        let patient_id = patient(&fixture);
        let result = fixture.monitoring.current(patient_id);
        assert!(matches!(
            result,
            Err(MonitorError::NotFound {
                entity: "Sensor reading",
                ..
            })
        ));
    }

    #[test]
    fn test_recent_respects_limit() {
        let fixture = fixture();
        let patient_id = patient(&fixture);
        let t0 = Utc::now();
        for i in 0..5 {
            fixture
                .monitoring
                .ingest(reading(
                    patient_id,
                    i as f64,
                    0.0,
                    1.0,
                    1.0,
                    Some(t0 + Duration::seconds(i)),
                ))
                .unwrap();
        }

        let recent = fixture.monitoring.recent(patient_id, 3).unwrap();
        let pitches: Vec<f64> = recent.iter().map(|s| s.imu_pitch).collect();
        assert_eq!(pitches, vec![4.0, 3.0, 2.0]);
    }
}
