//! MemTable implementation
//!
//! BTreeMap-based table with RwLock for concurrency.

use std::collections::BTreeMap;

use parking_lot::RwLock;

/// In-memory key/value records
///
/// Every operation takes the lock once, so each one appears to happen at a
/// single instant relative to the others.
pub struct MemTable {
    data: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
        }
    }

    /// Get a copy of the value stored at `key` (read lock)
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.data.read().get(key).cloned()
    }

    /// Get several keys under one read lock
    pub fn get_many<'a, I>(&self, keys: I) -> Vec<Option<Vec<u8>>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let data = self.data.read();
        keys.into_iter().map(|key| data.get(key).cloned()).collect()
    }

    /// Insert or overwrite a key (write lock)
    pub fn put(&self, key: String, value: Vec<u8>) {
        self.data.write().insert(key, value);
    }

    /// Insert several pairs under one write lock
    pub fn put_many<I>(&self, pairs: I)
    where
        I: IntoIterator<Item = (String, Vec<u8>)>,
    {
        let mut data = self.data.write();
        for (key, value) in pairs {
            data.insert(key, value);
        }
    }

    /// Remove a key, returning whether it was present
    pub fn delete(&self, key: &str) -> bool {
        self.data.write().remove(key).is_some()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Copy of every record in key order
    pub fn entries(&self) -> Vec<(String, Vec<u8>)> {
        self.data
            .read()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Swap in a whole new record set
    ///
    /// The new map is built before the write lock is taken, so readers see
    /// either the old set or the new one and never a mix.
    pub fn replace<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (String, Vec<u8>)>,
    {
        let fresh: BTreeMap<String, Vec<u8>> = entries.into_iter().collect();
        // Old map is dropped after the guard is released
        let old = std::mem::replace(&mut *self.data.write(), fresh);
        drop(old);
    }

    /// Remove all records
    pub fn clear(&self) {
        self.data.write().clear();
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}
