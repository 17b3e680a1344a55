//! Persistent per-pid record store.

use std::collections::BTreeMap;

use crate::types::ProcessRecord;

/// Owns every `ProcessRecord`. Keyed by pid, iterated in pid order.
#[derive(Debug, Default)]
pub struct ProcessStore {
    records: BTreeMap<i32, ProcessRecord>,
}

impl ProcessStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record for `pid`, creating a zeroed one when absent.
    /// The flag is `true` only when the record was created by this call.
    pub fn upsert(&mut self, pid: i32) -> (&mut ProcessRecord, bool) {
        let mut created = false;
        let record = self.records.entry(pid).or_insert_with(|| {
            created = true;
            ProcessRecord::new(pid)
        });
        (record, created)
    }

    pub fn get(&self, pid: i32) -> Option<&ProcessRecord> {
        self.records.get(&pid)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessRecord> {
        self.records.values()
    }

    /// Drops records whose pid has not been returned by the data source for
    /// more than `grace` cycles. Returns how many were removed.
    pub fn evict_unseen(&mut self, cycle: u64, grace: u64) -> usize {
        let before = self.records.len();
        self.records
            .retain(|_, r| cycle.saturating_sub(r.last_seen) <= grace);
        before - self.records.len()
    }
}
