// CalibrationManager: single-active calibration profile per patient
//
// Activation deactivates every active profile of the patient and inserts
// the new one in a single RecordStore::update_then_insert call, so two
// concurrent activations can never leave zero or two active profiles.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use super::find_by_id;
use crate::error::{log_monitor_error, MonitorError};
use crate::posture::Thresholds;
use crate::records::{from_row, from_rows, to_row, CalibrationProfile, CalibrationRequest, Patient, Record};
use crate::store::{Filter, OrderBy, Query, RecordStore, Row};
use crate::telemetry;

/// Selects and supersedes calibration profiles
///
/// # Example
/// ```ignore
/// let manager = CalibrationManager::new(store, Thresholds::DEFAULT);
/// manager.activate(CalibrationRequest::new(patient_id, Thresholds::new(6.0, 12.0)))?;
/// let thresholds = manager.thresholds_for(patient_id)?;
/// ```
pub struct CalibrationManager {
    store: Arc<dyn RecordStore>,
    defaults: Thresholds,
}

impl CalibrationManager {
    /// Create a manager falling back to `defaults` for uncalibrated patients
    pub fn new(store: Arc<dyn RecordStore>, defaults: Thresholds) -> Self {
        Self { store, defaults }
    }

    /// Thresholds used for patients without an active profile
    pub fn default_thresholds(&self) -> Thresholds {
        self.defaults
    }

    /// Activate a new calibration profile for the request's patient
    ///
    /// Missing thresholds are recommended from the patient's assessment.
    ///
    /// # Returns
    /// * `Ok(CalibrationProfile)` - The newly active profile
    ///
    /// # Errors
    /// - `NotFound` when the patient does not exist
    /// - `Validation` when thresholds or baselines are out of range
    /// - `Store` when the atomic write fails
    pub fn activate(&self, request: CalibrationRequest) -> Result<CalibrationProfile, MonitorError> {
        let patient_id = request.patient_id;
        let patient = find_by_id::<Patient>(self.store.as_ref(), patient_id)?
            .ok_or_else(|| MonitorError::not_found("Patient", patient_id))
            .inspect_err(|err| log_monitor_error(err, "activate_calibration"))?;

        let thresholds = if request.has_explicit_thresholds() {
            request.thresholds_or(self.defaults)
        } else {
            request.thresholds_or(patient.recommended_thresholds())
        };

        let profile = request
            .into_profile(thresholds, Utc::now())
            .inspect_err(|err| log_monitor_error(err, "activate_calibration"))?;

        let mut deactivate = Row::new();
        deactivate.insert("is_active".to_string(), Value::Bool(false));

        let row = self.store.update_then_insert(
            CalibrationProfile::TABLE,
            &active_filter(patient_id),
            &deactivate,
            to_row(&profile)?,
        )?;
        let profile: CalibrationProfile = from_row(row)?;

        log::info!(
            "[CalibrationManager] Activated profile {} for patient {} (warning={}, danger={})",
            profile.id,
            patient_id,
            profile.warning_threshold,
            profile.danger_threshold
        );
        telemetry::hub().record_calibration(
            patient_id,
            profile.warning_threshold,
            profile.danger_threshold,
        );

        Ok(profile)
    }

    /// Most recently created active profile, `Ok(None)` when there is none
    pub fn get_active(&self, patient_id: Uuid) -> Result<Option<CalibrationProfile>, MonitorError> {
        let rows = self.store.select(
            CalibrationProfile::TABLE,
            &Query::new(active_filter(patient_id))
                .order_by(OrderBy::desc("calibration_date"))
                .limit(1),
        )?;
        Ok(rows.into_iter().next().map(from_row).transpose()?)
    }

    /// Active thresholds for a patient, or the configured defaults
    pub fn thresholds_for(&self, patient_id: Uuid) -> Result<Thresholds, MonitorError> {
        Ok(self
            .get_active(patient_id)?
            .map(|profile| profile.thresholds())
            .unwrap_or(self.defaults))
    }

    /// Every profile ever saved for the patient, newest first
    pub fn history(&self, patient_id: Uuid) -> Result<Vec<CalibrationProfile>, MonitorError> {
        let rows = self.store.select(
            CalibrationProfile::TABLE,
            &Query::new(Filter::new().eq("patient_id", patient_id.to_string()))
                .order_by(OrderBy::desc("calibration_date")),
        )?;
        Ok(from_rows(rows)?)
    }
}

fn active_filter(patient_id: Uuid) -> Filter {
    Filter::new()
        .eq("patient_id", patient_id.to_string())
        .eq("is_active", true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::PatientManager;
    use crate::posture::MobilityLevel;
    use crate::records::NewPatient;
    use crate::store::MemoryStore;

    struct Fixture {
        patients: PatientManager,
        calibration: CalibrationManager,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        Fixture {
            patients: PatientManager::new(Arc::clone(&store)),
            calibration: CalibrationManager::new(store, Thresholds::DEFAULT),
        }
    }

    fn patient(fixture: &Fixture, severity: Option<u8>, mobility: Option<MobilityLevel>) -> Uuid {
        fixture
            .patients
            .create(NewPatient {
                full_name: "Test Patient".to_string(),
                severity_level: severity,
                mobility_level: mobility,
                ..NewPatient::default()
            })
            .unwrap()
            .id
    }

    #[test]
    fn test_get_active_without_profile() {
        let fixture = fixture();
        let patient_id = patient(&fixture, None, None);
        assert!(fixture.calibration.get_active(patient_id).unwrap().is_none());
        assert_eq!(
            fixture.calibration.thresholds_for(patient_id).unwrap(),
            Thresholds::DEFAULT
        );
    }

    #[test]
    fn test_second_activation_supersedes_first() {
        let fixture = fixture();
        let p1 = patient(&fixture, None, None);

        let a = fixture
            .calibration
            .activate(CalibrationRequest::new(p1, Thresholds::new(6.0, 12.0)))
            .unwrap();
        let b = fixture
            .calibration
            .activate(CalibrationRequest::new(p1, Thresholds::new(9.0, 16.0)))
            .unwrap();

        let active = fixture.calibration.get_active(p1).unwrap().unwrap();
        assert_eq!(active.id, b.id);
        assert!(active.is_active);

        let history = fixture.calibration.history(p1).unwrap();
        assert_eq!(history.len(), 2);
        let old = history.iter().find(|p| p.id == a.id).unwrap();
        assert!(!old.is_active);
        assert_eq!(history.iter().filter(|p| p.is_active).count(), 1);

        assert_eq!(
            fixture.calibration.thresholds_for(p1).unwrap(),
            Thresholds::new(9.0, 16.0)
        );
    }

    #[test]
    fn test_activation_is_scoped_to_patient() {
        let fixture = fixture();
        let p1 = patient(&fixture, None, None);
        let p2 = patient(&fixture, None, None);

        fixture
            .calibration
            .activate(CalibrationRequest::new(p1, Thresholds::new(6.0, 12.0)))
            .unwrap();
        fixture
            .calibration
            .activate(CalibrationRequest::new(p2, Thresholds::new(10.0, 18.0)))
            .unwrap();

        assert_eq!(
            fixture.calibration.thresholds_for(p1).unwrap(),
            Thresholds::new(6.0, 12.0)
        );
        assert_eq!(
            fixture.calibration.thresholds_for(p2).unwrap(),
            Thresholds::new(10.0, 18.0)
        );
    }

    #[test]
    fn test_missing_thresholds_use_recommendation() {
        let fixture = fixture();
        let p1 = patient(&fixture, Some(1), Some(MobilityLevel::Wheelchair));

        let profile = fixture
            .calibration
            .activate(CalibrationRequest {
                patient_id: p1,
                baseline_pitch: 1.5,
                baseline_roll: 0.0,
                warning_threshold: None,
                danger_threshold: None,
            })
            .unwrap();

        assert_eq!(profile.thresholds(), Thresholds::new(4.8, 9.6));
        assert_eq!(profile.baseline_pitch, 1.5);
    }

    #[test]
    fn test_unknown_patient_is_not_found() {
        let fixture = fixture();
        let result = fixture
            .calibration
            .activate(CalibrationRequest::new(Uuid::new_v4(), Thresholds::DEFAULT));
        assert!(matches!(result, Err(MonitorError::NotFound { .. })));
    }

    #[test]
    fn test_invalid_thresholds_keep_previous_profile() {
        let fixture = fixture();
        let p1 = patient(&fixture, None, None);
        let good = fixture
            .calibration
            .activate(CalibrationRequest::new(p1, Thresholds::new(6.0, 12.0)))
            .unwrap();

        let result = fixture
            .calibration
            .activate(CalibrationRequest::new(p1, Thresholds::new(20.0, 5.0)));
        assert!(matches!(result, Err(MonitorError::Validation { .. })));

        let active = fixture.calibration.get_active(p1).unwrap().unwrap();
        assert_eq!(active.id, good.id);
    }

    #[test]
    fn test_concurrent_activations_leave_one_active() {
        let fixture = Arc::new(fixture());
        let p1 = patient(&fixture, None, None);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let fixture = Arc::clone(&fixture);
                std::thread::spawn(move || {
                    fixture
                        .calibration
                        .activate(CalibrationRequest::new(
                            p1,
                            Thresholds::new(5.0 + i as f64, 20.0),
                        ))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let history = fixture.calibration.history(p1).unwrap();
        assert_eq!(history.len(), 8);
        assert_eq!(history.iter().filter(|p| p.is_active).count(), 1);
    }
}
