//! In-process key/value store with pattern-filtered snapshot iteration.
//!
//! # Architecture
//!
//! - `ValueStore` - thread-safe map from string keys to stored entries
//! - `StoredValue` - owned, `Send` deep copy of a runtime `Value`
//! - `pattern` - delimited regex parsing and the compiled-pattern LRU cache
//! - `StoreIterator` - eager snapshot exposed through the `Cursor` protocol
//!
//! Clones of a `ValueStore` share the same underlying map. Iterators own
//! their snapshot, so later writes to the store are never observed.

mod iterator;
mod pattern;

pub use iterator::StoreIterator;
pub use pattern::parse_pattern;

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use itertools::Itertools;
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use regex::Regex;
use smallvec::SmallVec;
use tracing::{debug, warn};

use super::buffer::ArrayBuffer;
use super::config::StoreConfig;
use super::errors::{ContainerError, ContainerResult};
use super::models::{Key, Value};

/// Key of a stored container entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredKey {
    Int(i64),
    Str(Arc<str>),
}

impl From<&Key> for StoredKey {
    fn from(key: &Key) -> Self {
        match key {
            Key::Int(n) => StoredKey::Int(*n),
            Key::Str(s) => StoredKey::Str(Arc::from(&**s)),
        }
    }
}

impl StoredKey {
    pub fn to_key(&self) -> Key {
        match self {
            StoredKey::Int(n) => Key::Int(*n),
            StoredKey::Str(s) => Key::Str(Rc::from(&**s)),
        }
    }
}

/// A value as held by the store: an owned tree with no shared buffers
/// and no reference cells, safe to hand across threads.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    Array(Vec<(StoredKey, StoredValue)>),
}

impl StoredValue {
    /// Deep-copy `value`, reading through references.
    ///
    /// Fails with `Recursion` if a container contains itself.
    pub fn from_value(value: &Value) -> ContainerResult<StoredValue> {
        let mut path = SmallVec::<[usize; 8]>::new();
        Self::convert(value, &mut path)
    }

    fn convert(value: &Value, path: &mut SmallVec<[usize; 8]>) -> ContainerResult<StoredValue> {
        Ok(match value {
            Value::Null | Value::Unset => StoredValue::Null,
            Value::Bool(b) => StoredValue::Bool(*b),
            Value::Int(n) => StoredValue::Int(*n),
            Value::Float(f) => StoredValue::Float(*f),
            Value::Str(s) => StoredValue::Str(Arc::from(&**s)),
            Value::Ref(cell) => return cell.with(|inner| Self::convert(inner, path))?,
            Value::Array(buf) => {
                let addr = Rc::as_ptr(buf) as usize;
                if path.contains(&addr) {
                    warn!(target: "arrayrt::store", depth = path.len(), "Rejecting recursive value");
                    return Err(ContainerError::Recursion);
                }
                path.push(addr);
                let entries = buf
                    .iter()
                    .map(|(k, v)| Ok((StoredKey::from(k), Self::convert(v, path)?)))
                    .collect::<ContainerResult<Vec<_>>>();
                path.pop();
                StoredValue::Array(entries?)
            }
        })
    }

    /// Rebuild a runtime value; containers come back as fresh buffers
    pub fn to_value(&self) -> Value {
        match self {
            StoredValue::Null => Value::Null,
            StoredValue::Bool(b) => Value::Bool(*b),
            StoredValue::Int(n) => Value::Int(*n),
            StoredValue::Float(f) => Value::Float(*f),
            StoredValue::Str(s) => Value::Str(Rc::from(&**s)),
            StoredValue::Array(entries) => Value::from(
                entries
                    .iter()
                    .map(|(k, v)| (k.to_key(), v.to_value()))
                    .collect::<ArrayBuffer>(),
            ),
        }
    }
}

#[derive(Debug, Clone)]
struct StoreEntry {
    value: StoredValue,
    /// Insertion sequence number; iteration order
    seq: u64,
    hits: u64,
    /// Seconds since the epoch at store time
    created: u64,
    /// 0 means the entry never expires
    ttl: u64,
    expires_at: Option<Instant>,
}

impl StoreEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

#[derive(Debug, Default)]
struct StoreState {
    entries: HashMap<String, StoreEntry>,
    next_seq: u64,
}

/// Thread-safe in-process value cache.
#[derive(Clone)]
pub struct ValueStore {
    state: Arc<RwLock<StoreState>>,
    patterns: Arc<Mutex<LruCache<String, Regex>>>,
    default_ttl: u64,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::with_config(&StoreConfig::default())
    }

    pub fn with_config(config: &StoreConfig) -> Self {
        let capacity = NonZeroUsize::new(config.pattern_cache_capacity).unwrap_or(NonZeroUsize::MIN);
        ValueStore {
            state: Arc::new(RwLock::new(StoreState::default())),
            patterns: Arc::new(Mutex::new(LruCache::new(capacity))),
            default_ttl: config.default_ttl_secs,
        }
    }

    /// Store `value` under `key` with the configured default TTL
    pub fn store(&self, key: &str, value: &Value) -> ContainerResult<()> {
        self.store_with_ttl(key, value, self.default_ttl)
    }

    /// Store `value` under `key`, replacing any previous entry.
    /// A `ttl_secs` of 0 never expires.
    pub fn store_with_ttl(&self, key: &str, value: &Value, ttl_secs: u64) -> ContainerResult<()> {
        let value = StoredValue::from_value(value)?;
        let mut state = self.state.write();
        let entry = Self::new_entry(&mut state, value, ttl_secs);
        state.entries.insert(key.to_string(), entry);
        Ok(())
    }

    /// Store only if `key` is absent (or expired). Returns whether it stored.
    pub fn add(&self, key: &str, value: &Value) -> ContainerResult<bool> {
        let value = StoredValue::from_value(value)?;
        let now = Instant::now();
        let mut state = self.state.write();
        if state.entries.get(key).is_some_and(|e| e.is_live(now)) {
            return Ok(false);
        }
        let entry = Self::new_entry(&mut state, value, self.default_ttl);
        state.entries.insert(key.to_string(), entry);
        Ok(true)
    }

    fn new_entry(state: &mut StoreState, value: StoredValue, ttl: u64) -> StoreEntry {
        let seq = state.next_seq;
        state.next_seq += 1;
        let created = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        StoreEntry {
            value,
            seq,
            hits: 0,
            created,
            ttl,
            // A deadline past what `Instant` can represent never arrives
            expires_at: (ttl > 0)
                .then(|| Instant::now().checked_add(Duration::from_secs(ttl)))
                .flatten(),
        }
    }

    /// Fetch a copy of the value under `key`, counting a hit.
    /// Expired entries are dropped and reported absent.
    pub fn fetch(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        let mut state = self.state.write();
        match state.entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.hits += 1;
                Some(entry.value.to_value())
            }
            Some(_) => {
                debug!(target: "arrayrt::store", key, "Dropping expired entry");
                state.entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn exists(&self, key: &str) -> bool {
        let now = Instant::now();
        self.state
            .read()
            .entries
            .get(key)
            .is_some_and(|e| e.is_live(now))
    }

    pub fn delete(&self, key: &str) -> bool {
        self.state.write().entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.state.write().entries.clear();
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.state
            .read()
            .entries
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot every live entry whose key matches the delimited `pattern`
    /// (e.g. `/key[0-9]0/`), in insertion order.
    pub fn iterate(&self, pattern: &str) -> ContainerResult<StoreIterator> {
        let regex = self.compile(pattern)?;
        Ok(self.snapshot(|key| regex.is_match(key)))
    }

    /// Snapshot every live entry, in insertion order
    pub fn iterate_all(&self) -> StoreIterator {
        self.snapshot(|_| true)
    }

    fn snapshot(&self, mut matches: impl FnMut(&str) -> bool) -> StoreIterator {
        let now = Instant::now();
        let state = self.state.read();
        let entries: Vec<_> = state
            .entries
            .iter()
            .filter(|(key, entry)| entry.is_live(now) && matches(key))
            .sorted_by_key(|(_, entry)| entry.seq)
            .map(|(key, entry)| iterator::SnapshotEntry {
                key: key.clone(),
                value: entry.value.clone(),
                hits: entry.hits,
                created: entry.created,
                ttl: entry.ttl,
            })
            .collect();
        debug!(
            target: "arrayrt::store",
            matched = entries.len(),
            total = state.entries.len(),
            "Took store snapshot"
        );
        StoreIterator::new(entries)
    }

    /// Compile a delimited pattern, memoised in the LRU cache
    fn compile(&self, pattern: &str) -> ContainerResult<Regex> {
        let mut cache = self.patterns.lock();
        if let Some(regex) = cache.get(pattern) {
            return Ok(regex.clone());
        }
        debug!(target: "arrayrt::store::pattern", pattern, "Pattern cache miss");
        let regex = parse_pattern(pattern)?;
        cache.put(pattern.to_string(), regex.clone());
        Ok(regex)
    }

    /// Number of compiled patterns currently cached
    pub fn cached_patterns(&self) -> usize {
        self.patterns.lock().len()
    }
}

impl Default for ValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueStore")
            .field("entries", &self.state.read().entries.len())
            .field("cached_patterns", &self.cached_patterns())
            .finish()
    }
}
