// Posture Monitor Core - Rust monitoring backend
// Sensor ingestion, posture evaluation and session analytics for rehab patients

// Module declarations
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod managers;
pub mod posture;
pub mod records;
pub mod store;
pub mod telemetry;

// Re-exports for convenience
pub use config::AppConfig;
pub use context::AppContext;
pub use error::{MonitorError, StoreError};
pub use posture::{evaluate, AlertLevel, PostureStatus, Thresholds, TiltDirection};

use tracing_subscriber::filter::LevelFilter;

/// Install the global tracing subscriber
///
/// `level` is a filter name such as `"info"` or `"debug"`; unknown names fall
/// back to `info`. Records emitted through the `log` facade are captured as
/// well. Calling this more than once is a no-op.
pub fn init_logging(level: &str) {
    let filter = level.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO);
    let _ = tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .try_init();
}
