//! FixedArray - declared-capacity container indexed 0..size.
//!
//! Storage is a plain vector padded with `Value::Unset`. A `FixedArray` is
//! an object handle: `share()` gives a second handle onto the same storage,
//! while `clone()` copies the elements into independent storage.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use super::buffer::ArrayBuffer;
use super::errors::{ContainerError, ContainerResult};
use super::models::{Key, Value};

#[derive(Debug)]
pub struct FixedArray {
    elements: Rc<RefCell<Vec<Value>>>,
}

impl FixedArray {
    pub fn new(size: usize) -> Self {
        FixedArray {
            elements: Rc::new(RefCell::new(vec![Value::Unset; size])),
        }
    }

    /// Build from the values of `source`, in order, re-indexed from 0
    pub fn from_array(source: &ArrayBuffer) -> Self {
        FixedArray {
            elements: Rc::new(RefCell::new(source.values().collect())),
        }
    }

    /// Another handle onto the same storage
    pub fn share(&self) -> FixedArray {
        FixedArray {
            elements: Rc::clone(&self.elements),
        }
    }

    pub fn ptr_eq(&self, other: &FixedArray) -> bool {
        Rc::ptr_eq(&self.elements, &other.elements)
    }

    /// Declared capacity
    pub fn size(&self) -> usize {
        self.elements.borrow().len()
    }

    /// Elements that are set (unset padding is not counted)
    pub fn count(&self) -> usize {
        self.elements
            .borrow()
            .iter()
            .filter(|v| !matches!(v, Value::Unset))
            .count()
    }

    /// Resize, truncating or padding with unset elements.
    /// Elements below the new size keep their indices.
    pub fn set_size(&self, size: usize) {
        let mut elements = self.elements.borrow_mut();
        trace!(target: "arrayrt::fixed", from = elements.len(), to = size, "Resizing fixed array");
        elements.resize(size, Value::Unset);
    }

    /// Read an element; an unset element reads as null
    pub fn get(&self, index: impl Into<Value>) -> ContainerResult<Value> {
        let i = self.index(&index.into())?;
        Ok(match &self.elements.borrow()[i] {
            Value::Unset => Value::Null,
            value => value.clone(),
        })
    }

    pub fn set(&self, index: impl Into<Value>, value: Value) -> ContainerResult<()> {
        let i = self.index(&index.into())?;
        let value = value.resolved()?;
        self.elements.borrow_mut()[i] = value;
        Ok(())
    }

    pub fn unset(&self, index: impl Into<Value>) -> ContainerResult<()> {
        let i = self.index(&index.into())?;
        self.elements.borrow_mut()[i] = Value::Unset;
        Ok(())
    }

    /// True if `index` is in range and holds a set element.
    /// Never fails: a malformed index simply does not exist.
    pub fn offset_exists(&self, index: impl Into<Value>) -> bool {
        self.index(&index.into())
            .map(|i| !matches!(self.elements.borrow()[i], Value::Unset))
            .unwrap_or(false)
    }

    /// Appending would grow the declared capacity, which is not allowed
    pub fn push(&self, _value: Value) -> ContainerResult<()> {
        Err(ContainerError::ImmutableWrite(format!(
            "cannot append to a fixed array of size {}",
            self.size()
        )))
    }

    /// Ordinary array holding every index; unset elements become null
    pub fn to_array(&self) -> ArrayBuffer {
        self.elements
            .borrow()
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let value = match v {
                    Value::Unset => Value::Null,
                    other => other.clone(),
                };
                (Key::from(i), value)
            })
            .collect()
    }

    /// Coerce an index value and check it against the declared size
    fn index(&self, offset: &Value) -> ContainerResult<usize> {
        let n = match offset {
            Value::Int(n) => *n,
            Value::Bool(b) => i64::from(*b),
            Value::Float(f) => *f as i64,
            Value::Str(s) => Key::intish(s).ok_or_else(|| {
                ContainerError::Type(format!("fixed array index must be an integer, \"{}\" given", s))
            })?,
            Value::Ref(cell) => return self.index(&cell.get()),
            other => {
                return Err(ContainerError::Type(format!(
                    "fixed array index must be an integer, {} given",
                    other.type_name()
                )))
            }
        };
        let size = self.size();
        if n < 0 || n as u64 >= size as u64 {
            return Err(ContainerError::Range { index: n, size });
        }
        Ok(n as usize)
    }
}

/// Isolating copy: later writes to either side are not seen by the other
impl Clone for FixedArray {
    fn clone(&self) -> Self {
        FixedArray {
            elements: Rc::new(RefCell::new(self.elements.borrow().clone())),
        }
    }
}

impl PartialEq for FixedArray {
    fn eq(&self, other: &Self) -> bool {
        *self.elements.borrow() == *other.elements.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_rejects_writes() {
        let a = FixedArray::new(0);
        let err = a.set(0i64, Value::Int(1)).unwrap_err();
        assert_eq!(err, ContainerError::Range { index: 0, size: 0 });
    }

    #[test]
    fn test_index_coercion() {
        let a = FixedArray::new(3);
        assert_eq!(a.set("asdf", Value::Int(1)).unwrap_err().kind(), "TypeError");
        assert_eq!(a.set(-1i64, Value::Int(1)).unwrap_err().kind(), "RangeError");
        a.set("2", Value::Int(2)).unwrap();
        a.set(true, Value::Int(1)).unwrap();
        assert_eq!(a.get(2i64).unwrap(), Value::Int(2));
        assert_eq!(a.get(1i64).unwrap(), Value::Int(1));
        assert_eq!(a.get(Value::Null).unwrap_err().kind(), "TypeError");
    }

    #[test]
    fn test_count_versus_size() {
        let a = FixedArray::new(0);
        a.set_size(10);
        for i in 0..5i64 {
            a.set(i, Value::Int(i)).unwrap();
        }
        a.unset(1i64).unwrap();
        assert_eq!(a.count(), 4);
        assert_eq!(a.size(), 10);
        assert_eq!(a.get(1i64).unwrap(), Value::Null);
        assert!(!a.offset_exists(1i64));
        assert!(a.offset_exists(2i64));
    }

    #[test]
    fn test_set_size_preserves_and_truncates() {
        let a = FixedArray::new(4);
        a.set(0i64, Value::from("a")).unwrap();
        a.set(3i64, Value::from("d")).unwrap();
        a.set_size(2);
        assert_eq!(a.get(0i64).unwrap(), Value::from("a"));
        assert!(a.get(3i64).is_err());
        a.set_size(5);
        assert_eq!(a.get(3i64).unwrap(), Value::Null);
        assert_eq!(a.count(), 1);
    }

    #[test]
    fn test_clone_isolates_share_does_not() {
        let a = FixedArray::new(2);
        a.set(0i64, Value::Int(1)).unwrap();
        let shared = a.share();
        let copy = a.clone();

        copy.set(0i64, Value::Int(2)).unwrap();
        shared.set(1i64, Value::Int(3)).unwrap();

        assert_eq!(a.get(0i64).unwrap(), Value::Int(1));
        assert_eq!(a.get(1i64).unwrap(), Value::Int(3));
        assert_eq!(copy.get(1i64).unwrap(), Value::Null);
        assert!(a.ptr_eq(&shared));
        assert!(!a.ptr_eq(&copy));
    }

    #[test]
    fn test_push_is_immutable_write() {
        let a = FixedArray::new(1);
        assert_eq!(a.push(Value::Null).unwrap_err().kind(), "ImmutableWriteError");
        assert_eq!(a.size(), 1);
    }

    #[test]
    fn test_array_round_trip_shapes() {
        let source = ArrayBuffer::from_pairs([("x", Value::Int(1)), ("y", Value::Int(2))]);
        let a = FixedArray::from_array(&source);
        assert_eq!(a.size(), 2);

        a.set_size(3);
        let back = a.to_array();
        let keys: Vec<_> = back.keys().cloned().collect();
        assert_eq!(keys, [Key::Int(0), Key::Int(1), Key::Int(2)]);
        assert_eq!(back.get(&Key::Int(2)).unwrap(), Value::Null);
    }
}
