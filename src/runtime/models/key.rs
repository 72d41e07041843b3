//! Array keys and the coercion rules applied when a value is used as a key.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use super::Value;
use crate::runtime::errors::{ContainerError, ContainerResult};

/// A container key: either an integer or a string.
///
/// Integer-like strings never appear as `Str`; construction through
/// `From<&str>` or `from_value` canonicalises them to `Int`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Int(i64),
    Str(Rc<str>),
}

impl Key {
    /// Coerce a value used in key position.
    ///
    /// - int stays int, bool becomes 0/1, float truncates toward zero
    /// - canonical decimal strings become int keys
    /// - null becomes the empty string key
    /// - arrays are rejected
    pub fn from_value(value: &Value) -> ContainerResult<Key> {
        match value {
            Value::Int(n) => Ok(Key::Int(*n)),
            Value::Bool(b) => Ok(Key::Int(*b as i64)),
            Value::Float(f) => Ok(Key::Int(f.trunc() as i64)),
            Value::Str(s) => Ok(Key::from(&**s)),
            Value::Null | Value::Unset => Ok(Key::Str(Rc::from(""))),
            Value::Array(_) => Err(ContainerError::Type("illegal offset type".to_string())),
            Value::Ref(cell) => Key::from_value(&cell.get()),
        }
    }

    /// Parse a string that is the canonical decimal form of an `i64`.
    ///
    /// `"12"` and `"-7"` qualify; `"012"`, `"+1"`, `" 1"`, `"-0"` and
    /// out-of-range numbers do not.
    pub fn intish(s: &str) -> Option<i64> {
        let digits = s.strip_prefix('-').unwrap_or(s);
        if digits.is_empty() || digits.len() > 20 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if digits.len() > 1 && digits.starts_with('0') {
            return None;
        }
        if s == "-0" {
            return None;
        }
        s.parse::<i64>().ok()
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Key::Int(_))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Key::Int(n) => Some(*n),
            Key::Str(_) => None,
        }
    }

    /// String form of the key, as the runtime prints it
    pub fn to_key_string(&self) -> String {
        match self {
            Key::Int(n) => n.to_string(),
            Key::Str(s) => s.to_string(),
        }
    }

    /// Convert back to a value (used when keys become data, e.g. `key()`)
    pub fn to_value(&self) -> Value {
        match self {
            Key::Int(n) => Value::Int(*n),
            Key::Str(s) => Value::Str(Rc::clone(s)),
        }
    }

    /// Default ordering used by key sorts.
    ///
    /// Numeric keys (integers and strings that parse as finite numbers)
    /// sort before every other key and compare by value; on equal values
    /// integers come first, then strings byte-wise. Non-numeric keys compare
    /// byte-wise. This is a total order over all keys.
    pub fn compare(&self, other: &Key) -> Ordering {
        match (self, other) {
            (Key::Int(a), Key::Int(b)) => a.cmp(b),
            _ => match (self.numeric(), other.numeric()) {
                (Some(a), Some(b)) => a
                    .total_cmp(&b)
                    .then_with(|| self.is_str().cmp(&other.is_str()))
                    .then_with(|| self.to_key_string().cmp(&other.to_key_string())),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => self.to_key_string().cmp(&other.to_key_string()),
            },
        }
    }

    fn is_str(&self) -> bool {
        matches!(self, Key::Str(_))
    }

    fn numeric(&self) -> Option<f64> {
        match self {
            Key::Int(n) => Some(*n as f64),
            Key::Str(s) => {
                let trimmed = s.trim_start();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
            }
        }
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Int(n)
    }
}

impl From<usize> for Key {
    fn from(n: usize) -> Self {
        Key::Int(n as i64)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        match Key::intish(s) {
            Some(n) => Key::Int(n),
            None => Key::Str(Rc::from(s)),
        }
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::from(s.as_str())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(n) => write!(f, "{}", n),
            Key::Str(s) => write!(f, "{}", s),
        }
    }
}
