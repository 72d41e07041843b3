//! StoreIterator - a snapshot of store entries behind the `Cursor` protocol.

use super::StoredValue;
use crate::runtime::buffer::{ArrayBuffer, Cursor};
use crate::runtime::models::{Key, Value};

#[derive(Debug, Clone)]
pub(super) struct SnapshotEntry {
    pub(super) key: String,
    pub(super) value: StoredValue,
    pub(super) hits: u64,
    pub(super) created: u64,
    pub(super) ttl: u64,
}

/// Iterator over an eagerly captured set of store entries.
///
/// `current()` yields an info array with the entry's `key`, `value`,
/// `num_hits`, `creation_time` and `ttl`.
#[derive(Debug, Clone)]
pub struct StoreIterator {
    entries: Vec<SnapshotEntry>,
    position: usize,
}

impl StoreIterator {
    pub(super) fn new(entries: Vec<SnapshotEntry>) -> Self {
        StoreIterator {
            entries,
            position: 0,
        }
    }

    /// Number of entries in the snapshot
    pub fn total_count(&self) -> usize {
        self.entries.len()
    }

    /// Sum of hit counts at snapshot time
    pub fn total_hits(&self) -> u64 {
        self.entries.iter().map(|e| e.hits).sum()
    }

    /// Stored value at the cursor, without the info wrapper
    pub fn current_value(&self) -> Option<Value> {
        self.entries.get(self.position).map(|e| e.value.to_value())
    }

    fn info(entry: &SnapshotEntry) -> Value {
        let to_int = |n: u64| Value::Int(i64::try_from(n).unwrap_or(i64::MAX));
        Value::from(ArrayBuffer::from_pairs([
            ("key", Value::from(entry.key.as_str())),
            ("value", entry.value.to_value()),
            ("num_hits", to_int(entry.hits)),
            ("creation_time", to_int(entry.created)),
            ("ttl", to_int(entry.ttl)),
        ]))
    }
}

impl Cursor for StoreIterator {
    fn reset(&mut self) -> Option<Value> {
        self.position = 0;
        self.current()
    }

    fn next(&mut self) -> Option<Value> {
        if self.position < self.entries.len() {
            self.position += 1;
        }
        self.current()
    }

    fn current(&self) -> Option<Value> {
        self.entries.get(self.position).map(Self::info)
    }

    fn key(&self) -> Option<Key> {
        self.entries
            .get(self.position)
            .map(|e| Key::from(e.key.as_str()))
    }

    fn valid(&self) -> bool {
        self.position < self.entries.len()
    }
}
