// Managers Module
//
// Focused managers wired together by AppContext. Each one owns a single
// concern and reaches the record store only through the injected handle:
// - PatientManager: patient profile CRUD
// - CalibrationManager: single-active-profile selection and thresholds
// - MonitoringManager: sample ingestion and posture evaluation
// - SessionManager: session lifecycle and analytics summaries

pub mod calibration_manager;
pub mod monitoring_manager;
pub mod patient_manager;
pub mod session_manager;

pub use calibration_manager::CalibrationManager;
pub use monitoring_manager::{Evaluation, MonitoringManager};
pub use patient_manager::PatientManager;
pub use session_manager::{AnalyticsSummary, SessionManager, Trend};

use uuid::Uuid;

use crate::error::StoreError;
use crate::records::{from_row, Record};
use crate::store::{Filter, Query, RecordStore};

/// Fetch a single record by primary key.
fn find_by_id<T: Record>(store: &dyn RecordStore, id: Uuid) -> Result<Option<T>, StoreError> {
    store
        .select(
            T::TABLE,
            &Query::new(Filter::new().eq("id", id.to_string())).limit(1),
        )?
        .into_iter()
        .next()
        .map(from_row)
        .transpose()
}
