// Runtime module for copy-on-write arrays with shared cursors
//
// This module provides:
// - `buffer`: the reference-counted ordered map and its iteration cursor
// - `handle`: variable slots and reference alias groups
// - `fixed`: the declared-capacity variant
// - `ops`: comparator-driven operations and key sorts
// - `store`: the in-process value store and its snapshot iterator

pub mod buffer;
pub mod config;
pub mod dump;
pub mod errors;
pub mod fixed;
pub mod handle;
pub mod models;
pub mod ops;
pub mod store;

pub use buffer::{ArrayBuffer, Cursor, CursorState};
pub use config::{DumpConfig, LogConfig, RuntimeConfig, StoreConfig};
pub use dump::{dump, dump_with};
pub use errors::{ContainerError, ContainerResult};
pub use fixed::FixedArray;
pub use handle::Handle;
pub use models::*;
pub use ops::{
    change_key_case, diff_uassoc, intersect_uassoc, ksort, strcasecmp, uksort, KeyCase, SortFlags,
};
pub use store::{parse_pattern, StoreIterator, StoredKey, StoredValue, ValueStore};
