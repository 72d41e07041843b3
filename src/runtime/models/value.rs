use std::rc::Rc;

use super::Reference;
use crate::runtime::buffer::ArrayBuffer;
use crate::runtime::errors::ContainerResult;

/// Any value a container entry or a variable slot can hold.
///
/// Containers are held behind `Rc` so that copying a value is O(1); the
/// buffer forks on the first write while shared (see `ArrayBuffer::make_owned`).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The null value
    Null,
    /// A boolean
    Bool(bool),
    /// A 64-bit integer
    Int(i64),
    /// A double
    Float(f64),
    /// An immutable string
    Str(Rc<str>),
    /// A nested container (copy-on-write)
    Array(Rc<ArrayBuffer>),
    /// An entry that re-references a variable slot
    Ref(Reference),
    /// Padding marker for declared-but-unwritten slots
    Unset,
}

impl Value {
    pub fn empty_array() -> Value {
        Value::Array(Rc::new(ArrayBuffer::new()))
    }

    /// Build a list with keys 0..n
    pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Value {
        Value::Array(Rc::new(ArrayBuffer::from_values(items)))
    }

    /// Type name as the runtime reports it
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null | Value::Unset => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Ref(cell) => cell.with(|v| v.type_name()).unwrap_or("reference"),
        }
    }

    /// `$x is arraykey`: int or string
    pub fn is_arraykey(&self) -> bool {
        match self {
            Value::Int(_) | Value::Str(_) => true,
            Value::Ref(cell) => cell.with(|v| v.is_arraykey()).unwrap_or(false),
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null | Value::Unset)
    }

    pub fn is_array(&self) -> bool {
        match self {
            Value::Array(_) => true,
            Value::Ref(cell) => cell.with(|v| v.is_array()).unwrap_or(false),
            _ => false,
        }
    }

    /// Borrow the buffer of a container value (no dereferencing)
    pub fn as_array(&self) -> Option<&Rc<ArrayBuffer>> {
        match self {
            Value::Array(buf) => Some(buf),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(&**s),
            _ => None,
        }
    }

    /// Strip one level of reference, yielding the referenced value
    pub fn dereferenced(self) -> Value {
        match self {
            Value::Ref(cell) => cell.get(),
            other => other,
        }
    }

    /// `dereferenced` for write paths: a slot that is mid-write is a
    /// `CyclicReference` instead of reading as null
    pub(crate) fn resolved(self) -> ContainerResult<Value> {
        match self {
            Value::Ref(cell) => cell.try_get(),
            other => Ok(other),
        }
    }

    /// Strong count of the container buffer, if this is a container
    pub fn refcount(&self) -> Option<usize> {
        self.as_array().map(Rc::strong_count)
    }

    /// String conversion used for value comparisons in array operations
    pub fn to_php_string(&self) -> String {
        match self {
            Value::Null | Value::Unset => String::new(),
            Value::Bool(true) => "1".to_string(),
            Value::Bool(false) => String::new(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Str(s) => s.to_string(),
            Value::Array(_) => "Array".to_string(),
            Value::Ref(cell) => cell.with(|v| v.to_php_string()).unwrap_or_default(),
        }
    }
}

/// Shortest round-trip float formatting; integral values print without a
/// fraction and large magnitudes switch to exponent form (`1.0E+25`).
pub(crate) fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "NAN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "INF" } else { "-INF" }.to_string();
    }
    let abs = f.abs();
    if abs != 0.0 && !(1e-4..1e15).contains(&abs) {
        let raw = format!("{:E}", f);
        let (mantissa, exponent) = raw.split_once('E').unwrap_or((raw.as_str(), "0"));
        let mantissa = if mantissa.contains('.') {
            mantissa.to_string()
        } else {
            format!("{}.0", mantissa)
        };
        let exponent = if exponent.starts_with('-') {
            exponent.to_string()
        } else {
            format!("+{}", exponent)
        };
        return format!("{}E{}", mantissa, exponent);
    }
    format!("{}", f)
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<ArrayBuffer> for Value {
    fn from(buf: ArrayBuffer) -> Self {
        Value::Array(Rc::new(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::from(1.5).type_name(), "float");
        assert_eq!(Value::empty_array().type_name(), "array");
        let cell = Reference::new(Value::from("s"));
        assert_eq!(Value::Ref(cell).type_name(), "string");
    }

    #[test]
    fn test_is_arraykey() {
        assert!(Value::from("foo").is_arraykey());
        assert!(Value::Int(1).is_arraykey());
        assert!(!Value::Float(1.5).is_arraykey());
        assert!(!Value::Bool(false).is_arraykey());
        assert!(!Value::Null.is_arraykey());
        assert!(!Value::empty_array().is_arraykey());
    }

    #[test]
    fn test_to_php_string() {
        assert_eq!(Value::Bool(true).to_php_string(), "1");
        assert_eq!(Value::Bool(false).to_php_string(), "");
        assert_eq!(Value::Int(-3).to_php_string(), "-3");
        assert_eq!(Value::Float(10.0).to_php_string(), "10");
        assert_eq!(Value::Float(1.5).to_php_string(), "1.5");
        assert_eq!(Value::Float(1e25).to_php_string(), "1.0E+25");
        assert_eq!(Value::empty_array().to_php_string(), "Array");
    }

    #[test]
    fn test_copy_shares_buffer() {
        let a = Value::list([Value::Int(1)]);
        let b = a.clone();
        assert_eq!(a.refcount(), Some(2));
        drop(b);
        assert_eq!(a.refcount(), Some(1));
    }
}
