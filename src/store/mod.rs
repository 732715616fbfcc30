//! Abstract record store reachable by table name, equality filters,
//! ordering, and limits.
//!
//! Managers receive an `Arc<dyn RecordStore>` at construction. The in-memory
//! implementation backs the server binary and the test suite; a managed
//! database adapter only has to implement [`RecordStore`].

use std::fmt;

use serde_json::{Map, Value};

use crate::error::StoreError;

pub mod memory;

pub use memory::MemoryStore;

/// A single row: column name to JSON value.
pub type Row = Map<String, Value>;

/// Tables known to the monitoring backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    SensorReadings,
    Patients,
    MonitoringSessions,
    DeviceCalibrations,
}

impl Table {
    pub const ALL: [Table; 4] = [
        Table::SensorReadings,
        Table::Patients,
        Table::MonitoringSessions,
        Table::DeviceCalibrations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::SensorReadings => "sensor_readings",
            Table::Patients => "patients",
            Table::MonitoringSessions => "monitoring_sessions",
            Table::DeviceCalibrations => "device_calibrations",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conjunction of column equality conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((column.into(), value.into()));
        self
    }

    /// An empty filter matches every row.
    pub fn matches(&self, row: &Row) -> bool {
        self.conditions
            .iter()
            .all(|(column, expected)| row.get(column) == Some(expected))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

/// Select parameters: filter, optional ordering, optional limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Filter,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            order_by: None,
            limit: None,
        }
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by = Some(order);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Logical record store operations consumed by the managers.
pub trait RecordStore: Send + Sync {
    /// Insert a row and return it as stored. An `id` column is assigned
    /// when the row does not carry one.
    fn insert(&self, table: Table, row: Row) -> Result<Row, StoreError>;

    /// Merge `patch` into every row matching `filter`; returns the updated rows.
    fn update(&self, table: Table, filter: &Filter, patch: &Row) -> Result<Vec<Row>, StoreError>;

    fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>, StoreError>;

    /// Apply `patch` to every row matching `filter` and insert `row` as one
    /// atomic write. No reader or writer observes the intermediate state.
    fn update_then_insert(
        &self,
        table: Table,
        filter: &Filter,
        patch: &Row,
        row: Row,
    ) -> Result<Row, StoreError>;
}
