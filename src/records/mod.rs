//! Typed records and the mapping layer between them and store rows.
//!
//! Every entity lives in exactly one [`Table`]; conversion goes through
//! `serde_json` so column names are the serde field names.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;
use crate::store::{Row, Table};

pub mod calibration;
pub mod patient;
pub mod sample;
pub mod session;

pub use calibration::{CalibrationProfile, CalibrationRequest};
pub use patient::{NewPatient, Patient, PatientUpdate, StrokeSide};
pub use sample::{SensorReadingRequest, SensorSample};
pub use session::{MonitoringSession, SessionSummary, StopSessionRequest};

/// A typed entity persisted in a single table.
pub trait Record: Serialize + DeserializeOwned {
    const TABLE: Table;
}

/// Convert any serializable struct into a row (object of columns).
pub fn to_row<T: Serialize>(value: &T) -> Result<Row, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(row) => Ok(row),
        other => Err(StoreError::MalformedRow {
            reason: format!("expected an object, got {}", other),
        }),
    }
}

pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

pub fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, StoreError> {
    rows.into_iter().map(from_row).collect()
}
