//! In-process store
//!
//! Backs tests and embedders that keep shifts in memory. Follows the same
//! conditional-write rules as [`ShiftStore`](super::ShiftStore).

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{check_expected, ShiftRepository, StoreError};
use crate::domain::{ShiftFilter, ShiftId, ShiftRecord, ShiftStatus};

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<ShiftId, ShiftRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-filled with `records`
    pub fn with_records(records: impl IntoIterator<Item = ShiftRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
        Self {
            records: Mutex::new(records),
        }
    }

    fn guard(&self) -> MutexGuard<'_, BTreeMap<ShiftId, ShiftRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }
}

impl ShiftRepository for MemoryStore {
    fn fetch_shifts(&self, filter: &ShiftFilter) -> Result<Vec<ShiftRecord>, StoreError> {
        Ok(filter.apply(self.guard().values()))
    }

    fn fetch_shift(&self, id: &ShiftId) -> Result<ShiftRecord, StoreError> {
        self.guard()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn write_shift(
        &self,
        record: &ShiftRecord,
        expected: Option<ShiftStatus>,
    ) -> Result<(), StoreError> {
        let mut records = self.guard();
        check_expected(&record.id, records.get(&record.id), expected)?;
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn delete_shift(&self, id: &ShiftId) -> Result<(), StoreError> {
        self.guard()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}
