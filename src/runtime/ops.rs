//! Comparator-driven array operations.
//!
//! These work through the public container surface only. Results are fresh
//! buffers; the in-place sorts go through the handle's copy-on-write gate.

use std::cmp::Ordering;

use super::buffer::ArrayBuffer;
use super::errors::{ContainerError, ContainerResult};
use super::handle::Handle;
use super::models::Key;

/// Target case for `change_key_case`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyCase {
    #[default]
    Lower,
    Upper,
}

/// Key ordering used by `ksort`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortFlags {
    /// Numeric where both keys are numeric, byte-wise otherwise
    #[default]
    Regular,
    /// Byte-wise comparison of the keys' string forms
    String,
}

/// ASCII case-insensitive comparison of two keys' string forms
pub fn strcasecmp(a: &Key, b: &Key) -> Ordering {
    let a = a.to_key_string();
    let b = b.to_key_string();
    a.bytes()
        .map(|c| c.to_ascii_lowercase())
        .cmp(b.bytes().map(|c| c.to_ascii_lowercase()))
}

/// True if `other` holds an entry whose key matches `key` under `key_cmp`
/// and whose value has the same string form as `value`
fn has_matching_entry<F>(other: &ArrayBuffer, key: &Key, value: &str, key_cmp: &mut F) -> bool
where
    F: FnMut(&Key, &Key) -> Ordering,
{
    other
        .iter()
        .any(|(k, v)| key_cmp(key, k) == Ordering::Equal && v.to_php_string() == value)
}

/// Entries of `first` present in every one of `others`.
///
/// Keys are matched with `key_cmp`; values are equal when their string
/// forms are. Order and keys of `first` are kept.
pub fn intersect_uassoc<F>(first: &ArrayBuffer, others: &[&ArrayBuffer], mut key_cmp: F) -> ArrayBuffer
where
    F: FnMut(&Key, &Key) -> Ordering,
{
    first
        .iter()
        .filter(|(key, value)| {
            let value = value.to_php_string();
            others
                .iter()
                .all(|other| has_matching_entry(other, key, &value, &mut key_cmp))
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Entries of `first` present in none of `others`, matched as in
/// `intersect_uassoc`
pub fn diff_uassoc<F>(first: &ArrayBuffer, others: &[&ArrayBuffer], mut key_cmp: F) -> ArrayBuffer
where
    F: FnMut(&Key, &Key) -> Ordering,
{
    first
        .iter()
        .filter(|(key, value)| {
            let value = value.to_php_string();
            !others
                .iter()
                .any(|other| has_matching_entry(other, key, &value, &mut key_cmp))
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Copy of `array` with string keys case-folded. Only ASCII letters fold,
/// matching `strcasecmp`; integer keys are kept. When two keys fold
/// together the later value wins at the earlier position.
pub fn change_key_case(array: &ArrayBuffer, case: KeyCase) -> ArrayBuffer {
    array
        .iter()
        .map(|(key, value)| {
            let key = match key {
                Key::Str(s) => match case {
                    KeyCase::Lower => Key::from(s.to_ascii_lowercase()),
                    KeyCase::Upper => Key::from(s.to_ascii_uppercase()),
                },
                int => int.clone(),
            };
            (key, value.clone())
        })
        .collect()
}

/// Sort the handle's array by key, in place. The cursor is rewound.
pub fn ksort(handle: &Handle, flags: SortFlags) -> ContainerResult<()> {
    match flags {
        SortFlags::Regular => uksort(handle, Key::compare),
        SortFlags::String => uksort(handle, |a, b| a.to_key_string().cmp(&b.to_key_string())),
    }
}

/// Sort the handle's array by key with a user comparator (stable)
pub fn uksort<F>(handle: &Handle, compare: F) -> ContainerResult<()>
where
    F: FnMut(&Key, &Key) -> Ordering,
{
    if !handle.is_array() {
        return Err(ContainerError::Type(format!(
            "ksort(): argument must be of type array, {} given",
            handle.value().type_name()
        )));
    }
    handle.with_buffer_mut(|buf| {
        buf.sort_by_keys(compare);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::models::{Reference, Value};

    fn keys_of(buf: &ArrayBuffer) -> Vec<String> {
        buf.keys().map(Key::to_key_string).collect()
    }

    #[test]
    fn test_strcasecmp() {
        assert_eq!(strcasecmp(&Key::from("ABC"), &Key::from("abc")), Ordering::Equal);
        assert_eq!(strcasecmp(&Key::from("a"), &Key::from("B")), Ordering::Less);
        assert_eq!(strcasecmp(&Key::Int(0), &Key::from("a")), Ordering::Less);
    }

    #[test]
    fn test_intersect_follows_reference_entries() {
        let ref_var = Reference::new(Value::from("a"));
        let array1 = ArrayBuffer::from_values([Value::from("a"), Value::from("a")]);
        let mut array2 = ArrayBuffer::from_pairs([("a", Value::Int(1))]);
        array2.set_ref(Key::Int(0), ref_var.clone());

        let result = intersect_uassoc(&array1, &[&array2], strcasecmp);
        assert_eq!(result, ArrayBuffer::from_pairs([(0i64, Value::from("a"))]));

        ref_var.set(Value::Int(10)).unwrap();
        let result = intersect_uassoc(&array1, &[&array2], strcasecmp);
        assert!(result.is_empty());

        let result = intersect_uassoc(&array1, &[&array1], strcasecmp);
        assert_eq!(result, array1);
    }

    #[test]
    fn test_intersect_requires_every_operand() {
        let first = ArrayBuffer::from_pairs([("A", Value::Int(1)), ("b", Value::Int(2))]);
        let second = ArrayBuffer::from_pairs([("a", Value::Int(1)), ("B", Value::Int(2))]);
        let third = ArrayBuffer::from_pairs([("b", Value::from("2"))]);

        let result = intersect_uassoc(&first, &[&second, &third], strcasecmp);
        assert_eq!(keys_of(&result), ["b"]);
    }

    #[test]
    fn test_diff_keeps_first_operand_order() {
        let first = ArrayBuffer::from_pairs([
            ("x", Value::Int(1)),
            ("a", Value::Int(2)),
            ("y", Value::Int(3)),
        ]);
        let second = ArrayBuffer::from_pairs([("A", Value::Int(2))]);
        let result = diff_uassoc(&first, &[&second], strcasecmp);
        assert_eq!(keys_of(&result), ["x", "y"]);
    }

    #[test]
    fn test_change_key_case_folds_ascii_only() {
        let input = ArrayBuffer::from_pairs([
            ("straße", Value::Int(1)),
            ("Élan", Value::Int(2)),
        ]);
        let upper = change_key_case(&input, KeyCase::Upper);
        assert_eq!(keys_of(&upper), ["STRAßE", "ÉLAN"]);
        let lower = change_key_case(&input, KeyCase::Lower);
        assert_eq!(keys_of(&lower), ["straße", "Élan"]);
        assert_eq!(lower.count(), 2);
        assert_eq!(
            strcasecmp(&Key::from("Élan"), &Key::from("ÉLAN")),
            Ordering::Equal
        );
    }

    #[test]
    fn test_change_key_case_collisions() {
        let input = ArrayBuffer::from_pairs([
            ("one", Value::Int(1)),
            ("ONE", Value::Int(2)),
            ("two", Value::Int(3)),
        ]);
        let mut with_int = input.clone();
        with_int.set(Key::Int(5), Value::Int(5)).unwrap();

        let upper = change_key_case(&with_int, KeyCase::Upper);
        assert_eq!(keys_of(&upper), ["ONE", "TWO", "5"]);
        assert_eq!(upper.get(&Key::from("ONE")).unwrap(), Value::Int(2));
        assert_eq!(keys_of(&input), ["one", "ONE", "two"], "input untouched");
    }

    #[test]
    fn test_ksort_regular_and_string() {
        let h = Handle::new(Value::from(ArrayBuffer::from_pairs([
            ("10", Value::Int(1)),
            ("9", Value::Int(2)),
            ("a", Value::Int(3)),
        ])));
        ksort(&h, SortFlags::Regular).unwrap();
        assert_eq!(h.key(), Some(Key::Int(9)));

        ksort(&h, SortFlags::String).unwrap();
        assert_eq!(h.key(), Some(Key::Int(10)));
    }

    #[test]
    fn test_ksort_forks_shared_buffer() {
        let h = Handle::new(Value::from(ArrayBuffer::from_pairs([
            ("b", Value::Int(1)),
            ("a", Value::Int(2)),
        ])));
        let copy = Handle::new(h.value());
        ksort(&h, SortFlags::Regular).unwrap();
        assert_eq!(h.key(), Some(Key::from("a")));
        assert_eq!(copy.key(), Some(Key::from("b")));
    }

    #[test]
    fn test_ksort_rejects_non_array() {
        let h = Handle::new(Value::Null);
        assert_eq!(ksort(&h, SortFlags::Regular).unwrap_err().kind(), "TypeError");
        assert_eq!(h.value(), Value::Null);
    }

    #[test]
    fn test_uksort_is_stable() {
        let h = Handle::new(Value::from(ArrayBuffer::from_pairs([
            ("b", Value::Int(1)),
            ("B", Value::Int(2)),
            ("a", Value::Int(3)),
        ])));
        uksort(&h, strcasecmp).unwrap();
        let keys: Vec<_> = h
            .value()
            .as_array()
            .map(|buf| keys_of(buf))
            .unwrap_or_default();
        assert_eq!(keys, ["a", "b", "B"]);
    }
}
