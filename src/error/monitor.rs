// Monitoring error types and constants

use crate::error::{ErrorCode, StoreError};
use log::{error, warn};
use std::fmt;

/// Monitoring error code constants
///
/// Error code range: 4001-4003
pub struct MonitorErrorCodes {}

impl MonitorErrorCodes {
    /// No record matched the lookup
    pub const NOT_FOUND: i32 = 4001;

    /// Input was rejected before reaching the store
    pub const VALIDATION: i32 = 4002;

    /// Underlying record store operation failed
    pub const STORE: i32 = 4003;
}

/// Log a monitoring error with structured context
///
/// Not-found and validation failures are expected client mistakes and are
/// logged at warn level; store failures are logged at error level.
pub fn log_monitor_error(err: &MonitorError, context: &str) {
    match err {
        MonitorError::Store { .. } => error!(
            "Monitor error in {}: code={}, component=Monitoring, message={}",
            context,
            err.code(),
            err.message()
        ),
        _ => warn!(
            "Monitor error in {}: code={}, component=Monitoring, message={}",
            context,
            err.code(),
            err.message()
        ),
    }
}

/// Errors returned by every monitoring operation
///
/// NotFound and Store are kept distinct so the HTTP layer can answer 404
/// versus 500 without inspecting message text.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorError {
    /// No matching record (patient, sensor reading, calibration, session)
    NotFound { entity: &'static str, id: String },

    /// Malformed or out-of-range input
    Validation { reason: String },

    /// Record store failure
    Store { details: String },
}

impl MonitorError {
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        MonitorError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        MonitorError::Validation {
            reason: reason.into(),
        }
    }
}

impl ErrorCode for MonitorError {
    fn code(&self) -> i32 {
        match self {
            MonitorError::NotFound { .. } => MonitorErrorCodes::NOT_FOUND,
            MonitorError::Validation { .. } => MonitorErrorCodes::VALIDATION,
            MonitorError::Store { .. } => MonitorErrorCodes::STORE,
        }
    }

    fn message(&self) -> String {
        match self {
            MonitorError::NotFound { entity, id } => format!("{} not found: {}", entity, id),
            MonitorError::Validation { reason } => format!("Invalid input: {}", reason),
            MonitorError::Store { details } => format!("Store operation failed: {}", details),
        }
    }
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MonitorError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for MonitorError {}

impl From<StoreError> for MonitorError {
    fn from(err: StoreError) -> Self {
        MonitorError::Store {
            details: err.message(),
        }
    }
}
