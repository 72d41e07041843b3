/// arrayrt - Copy-on-Write Arrays for a Dynamic-Language Runtime
///
/// This library provides the ordered associative container a dynamic
/// language needs so that plain assignment, reference assignment
/// (`$a =& $b`), pass-by-reference arguments and `clone` all behave
/// correctly without deep copying.
///
/// # Architecture
///
/// 1. **Buffers** (`runtime::buffer`)
///    - `ArrayBuffer` is an insertion-ordered key/value map shared as `Rc`
///    - The first write through a shared `Rc` forks it (`make_owned`)
///    - The iteration cursor lives in the buffer, so sharers see one cursor
///
/// 2. **Handles** (`runtime::handle`)
///    - A `Handle` is a variable slot
///    - Handles bound with `bind_ref` form an alias group over one cell
///    - Copy assignment shares the buffer until the first write
///
/// 3. **Around the core**
///    - `FixedArray`: declared capacity with range and type checked indices
///    - `ops`: `intersect_uassoc`, `diff_uassoc`, `change_key_case`, `ksort`
///    - `ValueStore`: thread-safe cache iterated through a pattern snapshot
///
/// # Example
///
/// ```rust
/// use arrayrt::{Handle, Value};
///
/// let a = Handle::new(Value::list([Value::from("zero"), Value::from("one")]));
/// let mut b = Handle::array();
/// b.bind_ref(&a);
///
/// a.next();
/// assert_eq!(b.current(), Some(Value::from("one")));
///
/// let copy = Handle::new(a.value());
/// copy.set(0i64, Value::from("changed")).unwrap();
/// assert_eq!(a.get(0i64).unwrap(), Value::from("zero"));
/// ```

pub mod runtime;

pub use runtime::{
    ArrayBuffer, ContainerError, ContainerResult, Cursor, CursorState, FixedArray, Handle, Key,
    Reference, RuntimeConfig, StoreIterator, Value, ValueStore,
};
