//! Account Store
//!
//! Engines own their per-account records through this key-value abstraction
//! instead of process-wide state, so several independent ledgers can live in
//! one process and tests stay deterministic.

use std::collections::BTreeMap;

use crate::types::Address;

/// Key-value map from account identifier to account record
pub trait AccountStore<R> {
    /// Copy of the stored record, if any
    fn get(&self, account: &Address) -> Option<R>;

    /// Insert or replace a record
    fn put(&mut self, account: Address, record: R);

    /// Remove a record, returning it
    fn remove(&mut self, account: &Address) -> Option<R>;

    /// All records in key order
    fn records(&self) -> Vec<(Address, R)>;

    /// Number of stored records
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ordered in-memory store
#[derive(Debug, Clone)]
pub struct MemoryStore<R> {
    entries: BTreeMap<Address, R>,
}

impl<R> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> MemoryStore<R> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<R: Clone> AccountStore<R> for MemoryStore<R> {
    fn get(&self, account: &Address) -> Option<R> {
        self.entries.get(account).cloned()
    }

    fn put(&mut self, account: Address, record: R) {
        self.entries.insert(account, record);
    }

    fn remove(&mut self, account: &Address) -> Option<R> {
        self.entries.remove(account)
    }

    fn records(&self) -> Vec<(Address, R)> {
        self.entries
            .iter()
            .map(|(account, record)| (*account, record.clone()))
            .collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
