// Error types for the posture monitor
//
// This module defines custom error types for record storage and monitoring
// operations, providing structured error handling with numeric error codes
// that the HTTP layer maps onto status codes.

mod monitor;
mod store;

pub use monitor::{log_monitor_error, MonitorError, MonitorErrorCodes};
pub use store::{log_store_error, StoreError, StoreErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the HTTP boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
