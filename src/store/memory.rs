// MemoryStore: in-process RecordStore backed by a single mutex
//
// All tables live behind one lock, so update_then_insert is atomic with
// respect to every other store operation.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::{Filter, Query, RecordStore, Row, Table};
use crate::error::{log_store_error, StoreError};

/// In-memory record store
///
/// Rows are kept per table in insertion order. Ordering compares numbers
/// numerically, RFC 3339 strings chronologically, and other strings
/// lexicographically; rows with a missing sort column sort last.
pub struct MemoryStore {
    tables: Mutex<HashMap<Table, Vec<Row>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let tables = Table::ALL
            .into_iter()
            .map(|table| (table, Vec::new()))
            .collect();
        Self {
            tables: Mutex::new(tables),
        }
    }

    #[cfg(test)]
    fn len(&self, table: Table) -> Result<usize, StoreError> {
        let tables = self.lock_tables()?;
        Ok(tables.get(&table).map(Vec::len).unwrap_or(0))
    }

    fn lock_tables(&self) -> Result<MutexGuard<'_, HashMap<Table, Vec<Row>>>, StoreError> {
        self.tables.lock().map_err(|_| {
            let err = StoreError::LockPoisoned;
            log_store_error(&err, "lock_tables");
            err
        })
    }

    fn with_id(mut row: Row) -> Row {
        if !row.get("id").is_some_and(|id| !id.is_null()) {
            row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }
        row
    }

    fn apply_patch(rows: &mut [Row], filter: &Filter, patch: &Row) -> Vec<Row> {
        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|row| filter.matches(row)) {
            for (column, value) in patch {
                row.insert(column.clone(), value.clone());
            }
            updated.push(row.clone());
        }
        updated
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MemoryStore {
    fn insert(&self, table: Table, row: Row) -> Result<Row, StoreError> {
        let row = Self::with_id(row);
        let mut tables = self.lock_tables()?;
        tables.entry(table).or_default().push(row.clone());
        log::debug!("[MemoryStore] insert into {}", table);
        Ok(row)
    }

    fn update(&self, table: Table, filter: &Filter, patch: &Row) -> Result<Vec<Row>, StoreError> {
        let mut tables = self.lock_tables()?;
        let rows = tables.entry(table).or_default();
        let updated = Self::apply_patch(rows, filter, patch);
        log::debug!("[MemoryStore] updated {} row(s) in {}", updated.len(), table);
        Ok(updated)
    }

    fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>, StoreError> {
        let tables = self.lock_tables()?;
        let mut rows: Vec<Row> = tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filter.matches(row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(tables);

        if let Some(order) = &query.order_by {
            // Later inserts win ties in descending order.
            if order.descending {
                rows.reverse();
            }
            rows.sort_by(|a, b| {
                compare_columns(a.get(&order.column), b.get(&order.column), order.descending)
            });
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        Ok(rows)
    }

    fn update_then_insert(
        &self,
        table: Table,
        filter: &Filter,
        patch: &Row,
        row: Row,
    ) -> Result<Row, StoreError> {
        let row = Self::with_id(row);
        let mut tables = self.lock_tables()?;
        let rows = tables.entry(table).or_default();
        let updated = Self::apply_patch(rows, filter, patch);
        rows.push(row.clone());
        log::debug!(
            "[MemoryStore] atomic update of {} row(s) plus insert into {}",
            updated.len(),
            table
        );
        Ok(row)
    }
}

fn compare_columns(a: Option<&Value>, b: Option<&Value>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if !a.is_null() && !b.is_null() => {
            let ordering = compare_values(a, b);
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        }
        (Some(a), _) if !a.is_null() => Ordering::Less,
        (_, Some(b)) if !b.is_null() => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => {
            match (
                a.parse::<DateTime<Utc>>().ok(),
                b.parse::<DateTime<Utc>>().ok(),
            ) {
                (Some(a), Some(b)) => a.cmp(&b),
                _ => a.cmp(b),
            }
        }
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}
