//! ArrayBuffer - the reference-counted, insertion-ordered key/value store.
//!
//! # Architecture
//!
//! - `ArrayBuffer` - slot vector with tombstones plus a key index
//! - `ArrayBuffer::make_owned` - the single copy-on-write gate
//! - `cursor` - the iteration position stored inside the buffer
//!
//! Buffers are shared as `Rc<ArrayBuffer>`. Copying a value bumps the
//! strong count; the first write through a shared `Rc` forks the
//! top-level entries (nested containers are shared, not deep-copied).

mod cursor;

pub use cursor::{Cursor, CursorState};

use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use super::errors::{ContainerError, ContainerResult};
use super::models::{Key, Reference, Value};

/// Below this many slots, holes are never compacted away
const COMPACT_MIN_SLOTS: usize = 8;

/// Ordered key -> value mapping with a built-in iteration cursor.
///
/// Removed entries leave a hole (`None`) in `slots` so that `unset` is O(1)
/// and slot positions stay stable; the cursor skips holes when it is read.
pub struct ArrayBuffer {
    /// Entries in insertion order; `None` marks a removed entry
    slots: Vec<Option<(Key, Value)>>,

    /// Key -> slot position
    index: HashMap<Key, usize>,

    /// Number of `Some` slots
    live: usize,

    /// Key used by the next `push`
    next_free: i64,

    /// Iteration position (a slot position, may point at a hole or past the end)
    cursor: Cell<usize>,
}

impl ArrayBuffer {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ArrayBuffer {
            slots: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
            live: 0,
            next_free: 0,
            cursor: Cell::new(0),
        }
    }

    /// Build a list: values keyed 0..n
    pub fn from_values<I: IntoIterator<Item = Value>>(values: I) -> Self {
        let mut buf = ArrayBuffer::new();
        for value in values {
            buf.insert_new(Key::Int(buf.next_free), value);
        }
        buf
    }

    /// Build from key/value pairs; later duplicates overwrite earlier values
    pub fn from_pairs<K: Into<Key>, I: IntoIterator<Item = (K, Value)>>(pairs: I) -> Self {
        pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
    }

    /// CoW: obtain a writable buffer, forking first if it is shared.
    ///
    /// A fork copies the top-level entries only and keeps the cursor at the
    /// same logical entry. No-op when `this` is the only owner.
    pub fn make_owned(this: &mut Rc<ArrayBuffer>) -> &mut ArrayBuffer {
        if Rc::strong_count(this) > 1 {
            trace!(
                target: "arrayrt::buffer::make_owned",
                entries = this.live,
                sharers = Rc::strong_count(this),
                "Forking shared buffer"
            );
            *this = Rc::new(this.fork());
        }
        Rc::make_mut(this)
    }

    /// Number of strong owners of a shared buffer
    pub fn refcount(this: &Rc<ArrayBuffer>) -> usize {
        Rc::strong_count(this)
    }

    /// Number of live entries
    pub fn count(&self) -> usize {
        self.live
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn contains_key(&self, key: &Key) -> bool {
        self.index.contains_key(key)
    }

    /// Look up `key`, reading through reference entries.
    ///
    /// Absence is reported as `NotFound`, never as a stored null.
    pub fn get(&self, key: &Key) -> ContainerResult<Value> {
        self.get_raw(key)
            .map(|v| v.clone().dereferenced())
            .ok_or_else(|| ContainerError::NotFound(key.clone()))
    }

    /// Look up `key` without reading through reference entries
    pub fn get_raw(&self, key: &Key) -> Option<&Value> {
        let pos = *self.index.get(key)?;
        self.slots[pos].as_ref().map(|(_, v)| v)
    }

    pub(crate) fn get_raw_mut(&mut self, key: &Key) -> Option<&mut Value> {
        let pos = *self.index.get(key)?;
        self.slots[pos].as_mut().map(|(_, v)| v)
    }

    /// Insert or overwrite `key`.
    ///
    /// Overwriting keeps the entry's position; a reference entry is written
    /// through, so the referenced slot changes. Inserting appends and never
    /// moves the cursor.
    pub fn set(&mut self, key: Key, value: Value) -> ContainerResult<()> {
        let value = value.resolved()?;
        match self.get_raw_mut(&key) {
            Some(Value::Ref(cell)) => cell.set(value),
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => {
                self.insert_new(key, value);
                Ok(())
            }
        }
    }

    /// Store a reference entry: `$array[key] = &$var`.
    ///
    /// Replaces whatever the entry held, including an older reference.
    pub fn set_ref(&mut self, key: Key, cell: Reference) {
        match self.get_raw_mut(&key) {
            Some(slot) => *slot = Value::Ref(cell),
            None => self.insert_new(key, Value::Ref(cell)),
        }
    }

    /// Append at the next free integer key, returning that key
    pub fn push(&mut self, value: Value) -> ContainerResult<Key> {
        if self.next_free == i64::MAX && self.contains_key(&Key::Int(i64::MAX)) {
            return Err(ContainerError::ImmutableWrite(
                "next element is already occupied".to_string(),
            ));
        }
        let value = value.resolved()?;
        let key = Key::Int(self.next_free);
        self.insert_new(key.clone(), value);
        Ok(key)
    }

    /// Remove `key`, returning the removed value. Absent keys are a no-op.
    ///
    /// The cursor is left where it was; if it pointed at the removed entry
    /// it now resolves to the next surviving entry.
    pub fn unset(&mut self, key: &Key) -> Option<Value> {
        let pos = self.index.remove(key)?;
        let (_, value) = self.slots[pos].take()?;
        self.live -= 1;
        self.maybe_compact();
        Some(value)
    }

    /// Live entries in order, reference entries not dereferenced
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.as_ref().map(|(k, v)| (k, v)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.iter().map(|(k, _)| k)
    }

    /// Values in order, read through reference entries
    pub fn values(&self) -> impl Iterator<Item = Value> + '_ {
        self.iter().map(|(_, v)| v.clone().dereferenced())
    }

    pub fn first_key(&self) -> Option<&Key> {
        self.keys().next()
    }

    pub fn last_key(&self) -> Option<&Key> {
        self.slots
            .iter()
            .rev()
            .find_map(|slot| slot.as_ref().map(|(k, _)| k))
    }

    /// Remove every entry and rewind the cursor
    pub fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
        self.live = 0;
        self.next_free = 0;
        self.cursor.set(0);
    }

    /// Reorder entries with a stable sort on keys; the cursor is rewound.
    ///
    /// `compare` need not be a total order: an inconsistent comparator
    /// yields some permutation of the entries. Storage is only replaced
    /// once the order is known, so a panicking comparator leaves the
    /// buffer as it was.
    pub fn sort_by_keys<F>(&mut self, mut compare: F)
    where
        F: FnMut(&Key, &Key) -> Ordering,
    {
        let order = {
            let keys: Vec<&Key> = self.keys().collect();
            let mut order: Vec<usize> = (0..keys.len()).collect();
            merge_sort_by(&mut order, |&a, &b| compare(keys[a], keys[b]));
            order
        };
        let mut entries: Vec<Option<(Key, Value)>> =
            self.slots.drain(..).flatten().map(Some).collect();
        let sorted = order
            .into_iter()
            .filter_map(|pos| entries[pos].take())
            .collect();
        self.rebuild(sorted);
        self.cursor.set(0);
    }

    /// Copy of the top-level entries with the cursor kept at the same
    /// logical entry. Used by `make_owned`.
    fn fork(&self) -> ArrayBuffer {
        let target = self.resolve(self.cursor.get());
        let mut cursor = 0;
        let mut slots = Vec::with_capacity(self.live);
        for (pos, slot) in self.slots.iter().enumerate() {
            if let Some(entry) = slot {
                if target.is_some_and(|t| t == pos) {
                    cursor = slots.len();
                }
                slots.push(Some(entry.clone()));
            }
        }
        if target.is_none() {
            cursor = slots.len();
        }
        let index = slots
            .iter()
            .enumerate()
            .filter_map(|(pos, slot)| slot.as_ref().map(|(k, _)| (k.clone(), pos)))
            .collect();
        ArrayBuffer {
            slots,
            index,
            live: self.live,
            next_free: self.next_free,
            cursor: Cell::new(cursor),
        }
    }

    /// Insert or overwrite in place, never writing through a reference entry
    pub(crate) fn put(&mut self, key: Key, value: Value) {
        match self.get_raw_mut(&key) {
            Some(slot) => *slot = value,
            None => self.insert_new(key, value),
        }
    }

    fn insert_new(&mut self, key: Key, value: Value) {
        if let Key::Int(n) = key {
            if n >= self.next_free {
                self.next_free = n.saturating_add(1);
            }
        }
        self.index.insert(key.clone(), self.slots.len());
        self.slots.push(Some((key, value)));
        self.live += 1;
    }

    /// Replace all storage with `entries` (assumed key-unique)
    fn rebuild(&mut self, entries: Vec<(Key, Value)>) {
        self.index.clear();
        self.slots.clear();
        self.live = 0;
        for (key, value) in entries {
            self.index.insert(key.clone(), self.slots.len());
            self.slots.push(Some((key, value)));
            self.live += 1;
        }
    }

    fn maybe_compact(&mut self) {
        let holes = self.slots.len() - self.live;
        if self.slots.len() > COMPACT_MIN_SLOTS && holes > self.live {
            self.compact();
        }
    }

    /// Drop holes, remapping the cursor to the same logical entry
    fn compact(&mut self) {
        trace!(
            target: "arrayrt::buffer::compact",
            slots = self.slots.len(),
            live = self.live,
            "Compacting buffer"
        );
        let target = self.resolve(self.cursor.get());
        let mut new_cursor = None;
        let mut slots = Vec::with_capacity(self.live);
        for (pos, slot) in self.slots.drain(..).enumerate() {
            if slot.is_some() {
                if target == Some(pos) {
                    new_cursor = Some(slots.len());
                }
                slots.push(slot);
            }
        }
        self.cursor.set(new_cursor.unwrap_or(slots.len()));
        self.slots = slots;
        for (pos, slot) in self.slots.iter().enumerate() {
            if let Some((key, _)) = slot {
                self.index.insert(key.clone(), pos);
            }
        }
    }
}

/// Stable bottom-up merge sort.
///
/// Each comparison only decides which of two run heads is taken next, so
/// every element is emitted exactly once whatever `compare` answers.
fn merge_sort_by<T: Copy, F>(items: &mut Vec<T>, mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    let len = items.len();
    let mut merged = Vec::with_capacity(len);
    let mut width = 1;
    while width < len {
        merged.clear();
        let mut start = 0;
        while start < len {
            let mid = (start + width).min(len);
            let end = (start + 2 * width).min(len);
            let (mut left, mut right) = (start, mid);
            while left < mid && right < end {
                // Take from the right run only when strictly smaller
                if compare(&items[right], &items[left]) == Ordering::Less {
                    merged.push(items[right]);
                    right += 1;
                } else {
                    merged.push(items[left]);
                    left += 1;
                }
            }
            merged.extend_from_slice(&items[left..mid]);
            merged.extend_from_slice(&items[right..end]);
            start = end;
        }
        std::mem::swap(items, &mut merged);
        width *= 2;
    }
}

/// Explicit clone: an independent buffer with the cursor rewound.
///
/// Top-level entries are copied (O(top-level size)); nested containers
/// are shared by reference count and fork on their own first write.
impl Clone for ArrayBuffer {
    fn clone(&self) -> Self {
        let copy = self.fork();
        copy.cursor.set(0);
        copy
    }
}

impl Default for ArrayBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Entries equal in order; the cursor is not part of equality
impl PartialEq for ArrayBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.live == other.live && self.iter().eq(other.iter())
    }
}

impl FromIterator<(Key, Value)> for ArrayBuffer {
    fn from_iter<I: IntoIterator<Item = (Key, Value)>>(iter: I) -> Self {
        let mut buf = ArrayBuffer::new();
        for (key, value) in iter {
            buf.put(key, value.dereferenced());
        }
        buf
    }
}

impl fmt::Debug for ArrayBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
