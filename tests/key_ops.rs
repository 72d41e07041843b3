//! Tests for key coercion and the comparator-driven operations

mod common;

use arrayrt::runtime::ops::{diff_uassoc, intersect_uassoc, ksort, strcasecmp, uksort, SortFlags};
use common::*;

fn buffer(handle: &Handle) -> std::rc::Rc<ArrayBuffer> {
    match handle.value() {
        Value::Array(buf) => buf,
        other => panic!("expected array, got {:?}", other),
    }
}

#[test]
fn test_intersect_uassoc_with_referenced_variable() {
    let ref_var = Handle::new(Value::from("a"));
    let array1 = Handle::new(Value::list([Value::from("a"), ref_var.value()]));
    let mut array2 = Handle::array();
    array2.set("a", Value::Int(1)).unwrap();
    array2.set_ref(0i64, &ref_var).unwrap();

    let result = intersect_uassoc(&buffer(&array1), &[&*buffer(&array2)], strcasecmp);
    assert_eq!(
        dump(&Value::from(result)),
        "array(1) {\n  [0]=>\n  string(1) \"a\"\n}\n"
    );

    ref_var.assign(Value::Int(10)).unwrap();
    let result = intersect_uassoc(&buffer(&array1), &[&*buffer(&array2)], strcasecmp);
    assert_eq!(dump(&Value::from(result)), "array(0) {\n}\n");

    array2.bind_ref(&array1);
    let result = intersect_uassoc(&buffer(&array1), &[&*buffer(&array2)], strcasecmp);
    assert_eq!(
        dump(&Value::from(result)),
        "array(2) {\n  [0]=>\n  string(1) \"a\"\n  [1]=>\n  string(1) \"a\"\n}\n"
    );
}

#[test]
fn test_diff_uassoc_is_complement_of_intersect() {
    let first = assoc(&[
        ("Red", Value::from("r")),
        ("green", Value::from("g")),
        ("blue", Value::from("b")),
    ]);
    let second = assoc(&[("red", Value::from("r")), ("BLUE", Value::from("x"))]);

    let both = intersect_uassoc(&buffer(&first), &[&*buffer(&second)], strcasecmp);
    let only = diff_uassoc(&buffer(&first), &[&*buffer(&second)], strcasecmp);

    let both: Vec<_> = both.keys().map(Key::to_key_string).collect();
    let only: Vec<_> = only.keys().map(Key::to_key_string).collect();
    assert_eq!(both, ["Red"]);
    assert_eq!(only, ["green", "blue"]);
}

#[test]
fn test_key_coercion_at_boundary() {
    let h = Handle::array();
    h.set_value_key(&Value::from("1"), Value::from("string one")).unwrap();
    assert_eq!(h.get(1i64).unwrap(), Value::from("string one"));

    h.set_value_key(&Value::from("01"), Value::from("padded")).unwrap();
    h.set_value_key(&Value::Bool(true), Value::from("true")).unwrap();
    h.set_value_key(&Value::Float(2.9), Value::from("float")).unwrap();
    h.set_value_key(&Value::Null, Value::from("null")).unwrap();

    assert_eq!(keys(&h), ["1", "01", "2", ""]);
    assert_eq!(h.get(1i64).unwrap(), Value::from("true"));

    let err = h
        .set_value_key(&Value::empty_array(), Value::Null)
        .unwrap_err();
    assert_eq!(err.kind(), "TypeError");
    assert_eq!(h.count().unwrap(), 4);
}

#[test]
fn test_ksort_mixed_keys() {
    let h = assoc(&[
        ("b", Value::Int(1)),
        ("10", Value::Int(2)),
        ("a", Value::Int(3)),
        ("2", Value::Int(4)),
    ]);
    h.next();
    ksort(&h, SortFlags::Regular).unwrap();
    assert_eq!(keys(&h), ["2", "10", "a", "b"]);
    assert_eq!(h.key(), Some(Key::Int(2)), "sort rewinds the cursor");
}

#[test]
fn test_uksort_through_alias() {
    let h = assoc(&[("B", Value::Int(1)), ("a", Value::Int(2))]);
    let alias = h.alias();
    uksort(&alias, strcasecmp).unwrap();
    assert_eq!(keys(&h), ["a", "B"]);
}

/// 64 keys mixing integers, "N.5" numeric strings and "Na" words,
/// shuffled with a fixed linear congruential sequence
fn mixed_keys(seed: u64) -> Handle {
    let h = Handle::array();
    let mut state = seed;
    for i in 0..64u64 {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let n = (state >> 33) % 50;
        let key = match i % 3 {
            0 => Key::Int(n as i64),
            1 => Key::from(format!("{}.5", n)),
            _ => Key::from(format!("{}a{}", n, i)),
        };
        h.set(key, Value::Int(i as i64)).unwrap();
    }
    h
}

#[test]
fn test_ksort_many_mixed_keys() {
    for seed in 0..200 {
        let h = mixed_keys(seed);
        let before = h.count().unwrap();
        ksort(&h, SortFlags::Regular).unwrap();
        assert_eq!(h.count().unwrap(), before, "seed {}", seed);

        let sorted = buffer(&h);
        let keys: Vec<&Key> = sorted.keys().collect();
        for pair in keys.windows(2) {
            assert_ne!(
                pair[0].compare(pair[1]),
                std::cmp::Ordering::Greater,
                "seed {}: {} before {}",
                seed,
                pair[0],
                pair[1]
            );
        }
        // Every numeric key precedes every word key
        let first_word = keys
            .iter()
            .position(|k| k.to_key_string().contains('a'))
            .unwrap_or(keys.len());
        assert!(keys[first_word..]
            .iter()
            .all(|k| k.to_key_string().contains('a')));
    }
}

#[test]
fn test_uksort_with_inconsistent_comparator() {
    let h = mixed_keys(7);
    let before = buffer(&h);
    let mut flip = false;
    uksort(&h, |_, _| {
        flip = !flip;
        if flip {
            std::cmp::Ordering::Less
        } else {
            std::cmp::Ordering::Greater
        }
    })
    .unwrap();

    assert_eq!(h.count().unwrap(), before.count());
    for (key, value) in before.iter() {
        assert_eq!(&h.get(key.clone()).unwrap(), value);
    }
    h.set("after", Value::Null).unwrap();
    assert!(h.contains_key("after"));
}
