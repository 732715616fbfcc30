// Patient records - profile and rehabilitation assessment

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Record;
use crate::error::MonitorError;
use crate::posture::{self, MobilityLevel, Thresholds};
use crate::store::Table;

const MAX_AGE: u8 = 130;

/// Side of the body affected by the stroke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokeSide {
    Left,
    Right,
    Both,
    NotSure,
}

/// Stored patient profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub notifications_enabled: bool,
    #[serde(default)]
    pub stroke_side: Option<StrokeSide>,
    /// Clinician-reported severity, 1 (mild) to 5 (severe)
    #[serde(default)]
    pub severity_level: Option<u8>,
    #[serde(default)]
    pub mobility_level: Option<MobilityLevel>,
    /// Months since the stroke
    #[serde(default)]
    pub stroke_timeline: Option<u32>,
    /// Rehabilitation status from onboarding, e.g. `active` or `completed`
    #[serde(default)]
    pub therapy_status: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Record for Patient {
    const TABLE: Table = Table::Patients;
}

impl Patient {
    /// Thresholds suggested by this patient's assessment
    pub fn recommended_thresholds(&self) -> Thresholds {
        posture::recommend(self.severity_level, self.mobility_level)
    }
}

/// Request body for patient creation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPatient {
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub notifications_enabled: bool,
    #[serde(default)]
    pub stroke_side: Option<StrokeSide>,
    #[serde(default)]
    pub severity_level: Option<u8>,
    #[serde(default)]
    pub mobility_level: Option<MobilityLevel>,
    #[serde(default)]
    pub stroke_timeline: Option<u32>,
    #[serde(default)]
    pub therapy_status: Option<String>,
}

impl NewPatient {
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.full_name.trim().is_empty() {
            return Err(MonitorError::validation("full_name must not be empty"));
        }
        validate_assessment(self.age, self.severity_level)
    }

    pub fn into_patient(self, created_at: DateTime<Utc>) -> Patient {
        Patient {
            id: Uuid::new_v4(),
            full_name: self.full_name.trim().to_string(),
            email: self.email,
            phone: self.phone,
            age: self.age,
            notifications_enabled: self.notifications_enabled,
            stroke_side: self.stroke_side,
            severity_level: self.severity_level,
            mobility_level: self.mobility_level,
            stroke_timeline: self.stroke_timeline,
            therapy_status: self.therapy_status,
            created_at,
        }
    }
}

/// Partial update; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_side: Option<StrokeSide>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobility_level: Option<MobilityLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_timeline: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub therapy_status: Option<String>,
}

impl PatientUpdate {
    pub fn validate(&self) -> Result<(), MonitorError> {
        if let Some(name) = &self.full_name {
            if name.trim().is_empty() {
                return Err(MonitorError::validation("full_name must not be empty"));
            }
        }
        validate_assessment(self.age, self.severity_level)
    }
}

fn validate_assessment(age: Option<u8>, severity_level: Option<u8>) -> Result<(), MonitorError> {
    if let Some(age) = age {
        if age > MAX_AGE {
            return Err(MonitorError::validation(format!(
                "age must be between 0 and {} (got {})",
                MAX_AGE, age
            )));
        }
    }
    if let Some(level) = severity_level {
        if !(1..=5).contains(&level) {
            return Err(MonitorError::validation(format!(
                "severity_level must be between 1 and 5 (got {})",
                level
            )));
        }
    }
    Ok(())
}
