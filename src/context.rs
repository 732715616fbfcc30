// AppContext: Dependency Injection Container
// Owns the record store handle and wires every manager to it

use std::sync::Arc;

use crate::config::AppConfig;
use crate::managers::{CalibrationManager, MonitoringManager, PatientManager, SessionManager};
use crate::store::{MemoryStore, RecordStore};

/// AppContext: dependency injection container for all application state
///
/// The store is injected once and shared by the managers, so tests and
/// alternative backends swap it at a single point. Cloning is cheap; every
/// field is reference counted.
#[derive(Clone)]
pub struct AppContext {
    config: Arc<AppConfig>,
    store: Arc<dyn RecordStore>,
    patients: Arc<PatientManager>,
    calibration: Arc<CalibrationManager>,
    monitoring: Arc<MonitoringManager>,
    sessions: Arc<SessionManager>,
}

impl AppContext {
    /// Build a context over an existing store
    pub fn new(config: AppConfig, store: Arc<dyn RecordStore>) -> Self {
        let calibration = Arc::new(CalibrationManager::new(
            Arc::clone(&store),
            config.thresholds.thresholds(),
        ));
        Self {
            patients: Arc::new(PatientManager::new(Arc::clone(&store))),
            monitoring: Arc::new(MonitoringManager::new(
                Arc::clone(&store),
                Arc::clone(&calibration),
            )),
            sessions: Arc::new(SessionManager::new(
                Arc::clone(&store),
                Arc::clone(&calibration),
            )),
            calibration,
            store,
            config: Arc::new(config),
        }
    }

    /// Context backed by a fresh in-memory store
    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(config, Arc::new(MemoryStore::new()))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn patients(&self) -> &PatientManager {
        &self.patients
    }

    pub fn calibration(&self) -> &CalibrationManager {
        &self.calibration
    }

    pub fn monitoring(&self) -> &MonitoringManager {
        &self.monitoring
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::in_memory(AppConfig::default())
    }
}
