//! Test utilities for arrayrt integration tests
//!
//! This module provides shared helpers, including:
//! - Building handles over lists and key/value pairs
//! - Reading keys back out of a handle in iteration order
//! - Collecting the values a cursor walks over

#![allow(dead_code)]

pub use arrayrt::runtime::{dump, ArrayBuffer, Cursor};
pub use arrayrt::{ContainerError, Handle, Key, Value};

/// Handle over a list of string values keyed 0..n
pub fn list(items: &[&str]) -> Handle {
    Handle::new(Value::list(items.iter().map(|s| Value::from(*s))))
}

/// Handle over key/value pairs in the given order
pub fn assoc(pairs: &[(&str, Value)]) -> Handle {
    Handle::new(Value::from(ArrayBuffer::from_pairs(
        pairs.iter().map(|(k, v)| (*k, v.clone())),
    )))
}

/// Keys of the handle's array, as strings, in iteration order
pub fn keys(handle: &Handle) -> Vec<String> {
    match handle.value() {
        Value::Array(buf) => buf.keys().map(Key::to_key_string).collect(),
        _ => Vec::new(),
    }
}

/// Values a cursor yields from a reset to past-last
pub fn walk<C: Cursor + ?Sized>(cursor: &mut C) -> Vec<Value> {
    let mut seen = Vec::new();
    let mut current = cursor.reset();
    while let Some(value) = current {
        seen.push(value);
        current = cursor.next();
    }
    seen
}
