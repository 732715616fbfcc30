// Record store error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Record store error code constants
///
/// Error code range: 3001-3003
pub struct StoreErrorCodes {}

impl StoreErrorCodes {
    /// Store lock was poisoned by a panicking writer
    pub const LOCK_POISONED: i32 = 3001;

    /// Row is not a JSON object or lacks a required column
    pub const MALFORMED_ROW: i32 = 3002;

    /// Typed record could not be converted to or from a row
    pub const SERIALIZATION: i32 = 3003;
}

/// Log a store error with structured context
pub fn log_store_error(err: &StoreError, context: &str) {
    error!(
        "Store error in {}: code={}, component=RecordStore, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Record store errors
///
/// These errors cover the persistence boundary: lock management in the
/// in-memory store and the mapping between typed records and rows.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Store lock was poisoned
    LockPoisoned,

    /// Row shape did not match expectations
    MalformedRow { reason: String },

    /// serde mapping failed
    Serialization { details: String },
}

impl ErrorCode for StoreError {
    fn code(&self) -> i32 {
        match self {
            StoreError::LockPoisoned => StoreErrorCodes::LOCK_POISONED,
            StoreError::MalformedRow { .. } => StoreErrorCodes::MALFORMED_ROW,
            StoreError::Serialization { .. } => StoreErrorCodes::SERIALIZATION,
        }
    }

    fn message(&self) -> String {
        match self {
            StoreError::LockPoisoned => "Record store lock poisoned".to_string(),
            StoreError::MalformedRow { reason } => format!("Malformed row: {}", reason),
            StoreError::Serialization { details } => {
                format!("Record serialization failed: {}", details)
            }
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StoreError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for StoreError {}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization {
            details: err.to_string(),
        }
    }
}
