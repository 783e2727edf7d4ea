// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{Record, RecordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("index {index} out of range for {len} records")]
pub struct IndexOutOfRange {
    pub index: usize,
    pub len: usize,
}

/// Local mirror of the record store, addressed by absolute index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListStore {
    records: Vec<Record>,
}

/// Saved contents of a [`ListStore`], restored by [`ListStore::rollback`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCheckpoint {
    records: Vec<Record>,
}

impl ListStore {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn position_of(&self, id: RecordId) -> Option<usize> {
        self.records.iter().position(|record| record.id == id)
    }

    pub fn find(&self, id: RecordId) -> Option<&Record> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn names(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|record| record.name.clone())
            .collect()
    }

    pub fn replace_all(&mut self, records: Vec<Record>) {
        self.records = records;
    }

    pub fn append_one(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Returns the record that was replaced.
    pub fn replace_at(&mut self, index: usize, record: Record) -> Result<Record, IndexOutOfRange> {
        let len = self.records.len();
        let slot = self
            .records
            .get_mut(index)
            .ok_or(IndexOutOfRange { index, len })?;
        Ok(std::mem::replace(slot, record))
    }

    /// Removes the record at `index`. Every later record moves up one slot,
    /// so indices computed before this call no longer line up.
    pub fn remove_at(&mut self, index: usize) -> Result<Record, IndexOutOfRange> {
        if index >= self.records.len() {
            return Err(IndexOutOfRange {
                index,
                len: self.records.len(),
            });
        }
        Ok(self.records.remove(index))
    }

    pub fn checkpoint(&self) -> ListCheckpoint {
        ListCheckpoint {
            records: self.records.clone(),
        }
    }

    pub fn rollback(&mut self, checkpoint: ListCheckpoint) {
        self.records = checkpoint.records;
    }
}
