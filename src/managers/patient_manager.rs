// PatientManager: plain patient profile CRUD

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::find_by_id;
use crate::error::{log_monitor_error, MonitorError};
use crate::records::{from_row, from_rows, to_row, NewPatient, Patient, PatientUpdate, Record};
use crate::store::{Filter, OrderBy, Query, RecordStore};

/// Manages patient profiles
pub struct PatientManager {
    store: Arc<dyn RecordStore>,
}

impl PatientManager {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn create(&self, new_patient: NewPatient) -> Result<Patient, MonitorError> {
        new_patient.validate().inspect_err(|err| {
            log_monitor_error(err, "create_patient");
        })?;

        let patient = new_patient.into_patient(Utc::now());
        let row = self.store.insert(Patient::TABLE, to_row(&patient)?)?;
        log::info!("[PatientManager] Created patient {}", patient.id);
        Ok(from_row(row)?)
    }

    /// # Errors
    /// - `NotFound` when no patient has this id
    pub fn get(&self, patient_id: Uuid) -> Result<Patient, MonitorError> {
        find_by_id::<Patient>(self.store.as_ref(), patient_id)?.ok_or_else(|| {
            let err = MonitorError::not_found("Patient", patient_id);
            log_monitor_error(&err, "get_patient");
            err
        })
    }

    /// All patients, oldest first
    pub fn list(&self) -> Result<Vec<Patient>, MonitorError> {
        let rows = self.store.select(
            Patient::TABLE,
            &Query::new(Filter::new()).order_by(OrderBy::asc("created_at")),
        )?;
        Ok(from_rows(rows)?)
    }

    pub fn update(&self, patient_id: Uuid, update: PatientUpdate) -> Result<Patient, MonitorError> {
        update.validate().inspect_err(|err| {
            log_monitor_error(err, "update_patient");
        })?;

        let mut patch = to_row(&update)?;
        if let Some(name) = patch.get_mut("full_name") {
            if let Some(trimmed) = name.as_str().map(|n| n.trim().to_string()) {
                *name = trimmed.into();
            }
        }

        let updated = self.store.update(
            Patient::TABLE,
            &Filter::new().eq("id", patient_id.to_string()),
            &patch,
        )?;

        match updated.into_iter().next() {
            Some(row) => Ok(from_row(row)?),
            None => {
                let err = MonitorError::not_found("Patient", patient_id);
                log_monitor_error(&err, "update_patient");
                Err(err)
            }
        }
    }
}
