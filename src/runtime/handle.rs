//! Handles - variable slots and alias groups.
//!
//! A `Handle` is one variable. Handles that were bound with `bind_ref`
//! (`$a =& $b`) or created with `alias` form an alias group: they hold the
//! same `Reference` cell, so they always denote the same buffer and the
//! same cursor.
//!
//! Copy assignment (`assign_from`, `$a = $b`) only shares the buffer. The
//! first write through either side forks it via `ArrayBuffer::make_owned`.
//! An alias group counts as one owner of its buffer: a write through any
//! member forks only if something outside the group shares the buffer,
//! and the fork is stored in the shared cell where every member sees it.

use tracing::trace;

use super::buffer::{ArrayBuffer, Cursor, CursorState};
use super::errors::{ContainerError, ContainerResult};
use super::models::{Key, Reference, Value};

#[derive(Debug)]
pub struct Handle {
    cell: Reference,
}

impl Handle {
    pub fn new(value: Value) -> Self {
        Handle {
            cell: Reference::new(value),
        }
    }

    /// A handle holding a fresh empty array
    pub fn array() -> Self {
        Handle::new(Value::empty_array())
    }

    /// Join the group behind an existing reference cell
    pub fn from_reference(cell: Reference) -> Self {
        Handle { cell }
    }

    pub fn reference(&self) -> &Reference {
        &self.cell
    }

    /// Copy the value out (containers are shared until written)
    pub fn value(&self) -> Value {
        self.cell.get()
    }

    /// `$h = value`: every member of the alias group observes the new value
    pub fn assign(&self, value: Value) -> ContainerResult<()> {
        self.cell.set(value)
    }

    /// `$h = $other`: copy assignment, the buffer is shared copy-on-write
    pub fn assign_from(&self, other: &Handle) -> ContainerResult<()> {
        self.cell.set(other.value())
    }

    /// `$h =& $other`: leave the current group and join `other`'s
    pub fn bind_ref(&mut self, other: &Handle) {
        trace!(
            target: "arrayrt::handle",
            holders = other.cell.strong_count() + 1,
            "Binding reference"
        );
        self.cell = other.cell.clone();
    }

    /// A new handle in this handle's alias group
    pub fn alias(&self) -> Handle {
        Handle {
            cell: self.cell.clone(),
        }
    }

    /// Leave the alias group, keeping a copy-on-write copy of the value
    pub fn unbind(&mut self) {
        if self.cell.strong_count() > 1 {
            trace!(target: "arrayrt::handle", "Unbinding reference");
            self.cell = Reference::new(self.cell.get());
        }
    }

    pub fn is_alias_of(&self, other: &Handle) -> bool {
        self.cell.ptr_eq(&other.cell)
    }

    /// Holders of the group's cell (handles plus container entries)
    pub fn alias_count(&self) -> usize {
        self.cell.strong_count()
    }

    /// Strong count of the buffer this handle denotes, if it holds a container
    pub fn buffer_refcount(&self) -> Option<usize> {
        self.cell.with(Value::refcount).ok().flatten()
    }

    pub fn is_array(&self) -> bool {
        self.cell.with(Value::is_array).unwrap_or(false)
    }

    // ------------------------------------------------------------------
    // Container operations
    // ------------------------------------------------------------------

    pub fn get(&self, key: impl Into<Key>) -> ContainerResult<Value> {
        let key = key.into();
        self.cell.with(|slot| match slot {
            Value::Array(buf) => buf.get(&key),
            _ => Err(ContainerError::NotFound(key.clone())),
        })?
    }

    pub fn contains_key(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        self.cell
            .with(|slot| slot.as_array().is_some_and(|buf| buf.contains_key(&key)))
            .unwrap_or(false)
    }

    /// `$h[key] = value`. A null handle becomes an empty array first.
    pub fn set(&self, key: impl Into<Key>, value: Value) -> ContainerResult<()> {
        let key = key.into();
        self.with_buffer_mut(|buf| buf.set(key, value))
    }

    /// `$h[$k] = value` with a dynamic key value
    pub fn set_value_key(&self, key: &Value, value: Value) -> ContainerResult<()> {
        let key = Key::from_value(key)?;
        self.set(key, value)
    }

    /// `$h[] = value`
    pub fn push(&self, value: Value) -> ContainerResult<Key> {
        self.with_buffer_mut(|buf| buf.push(value))
    }

    /// `unset($h[key])`, returning the removed value if there was one
    pub fn unset(&self, key: impl Into<Key>) -> ContainerResult<Option<Value>> {
        let key = key.into();
        if !self.is_array() {
            return Ok(None);
        }
        self.with_buffer_mut(|buf| Ok(buf.unset(&key)))
    }

    /// `$h[key] = &$target`
    pub fn set_ref(&self, key: impl Into<Key>, target: &Handle) -> ContainerResult<()> {
        let key = key.into();
        let cell = target.cell.clone();
        self.with_buffer_mut(|buf| {
            buf.set_ref(key, cell);
            Ok(())
        })
    }

    /// `$x = &$h[key]`: turn the entry into a reference slot and return a
    /// handle bound to it. A missing entry is created as null.
    pub fn ref_at(&self, key: impl Into<Key>) -> ContainerResult<Handle> {
        let key = key.into();
        self.with_buffer_mut(|buf| {
            if let Some(Value::Ref(cell)) = buf.get_raw(&key) {
                return Ok(Handle::from_reference(cell.clone()));
            }
            let cell = Reference::new(buf.get(&key).unwrap_or(Value::Null));
            buf.set_ref(key, cell.clone());
            Ok(Handle::from_reference(cell))
        })
    }

    /// Read `$h[k0][k1]...`
    pub fn get_in(&self, path: &[Key]) -> ContainerResult<Value> {
        self.cell.with(|slot| read_path(slot, path))?
    }

    /// Write `$h[k0][k1]... = value`, creating intermediate arrays for
    /// missing or null entries. Each level forks only if it is shared.
    pub fn set_in(&self, path: &[Key], value: Value) -> ContainerResult<()> {
        self.cell.with_mut(|slot| write_path(slot, path, value))
    }

    /// Number of entries; only containers are countable
    pub fn count(&self) -> ContainerResult<usize> {
        self.cell.with(|slot| match slot {
            Value::Array(buf) => Ok(buf.count()),
            other => Err(ContainerError::Type(format!(
                "count(): argument must be of type array, {} given",
                other.type_name()
            ))),
        })?
    }

    /// Replace the held buffer with an independent clone (`clone` semantics)
    pub fn detach(&self) -> ContainerResult<()> {
        self.cell.with_mut(|slot| {
            if let Value::Array(buf) = slot {
                *slot = Value::from(ArrayBuffer::clone(buf));
            }
            Ok(())
        })
    }

    /// Writable access to the held buffer through the CoW gate
    pub(crate) fn with_buffer_mut<R>(
        &self,
        f: impl FnOnce(&mut ArrayBuffer) -> ContainerResult<R>,
    ) -> ContainerResult<R> {
        self.cell.with_mut(|slot| f(writable_array(slot)?))
    }

    // ------------------------------------------------------------------
    // Cursor operations (never fork)
    // ------------------------------------------------------------------

    fn with_array<R>(&self, f: impl FnOnce(&ArrayBuffer) -> Option<R>) -> Option<R> {
        self.cell
            .with(|slot| slot.as_array().and_then(|buf| f(buf.as_ref())))
            .ok()
            .flatten()
    }

    pub fn current(&self) -> Option<Value> {
        self.with_array(ArrayBuffer::current)
    }

    pub fn key(&self) -> Option<Key> {
        self.with_array(ArrayBuffer::key)
    }

    pub fn next(&self) -> Option<Value> {
        self.with_array(ArrayBuffer::next)
    }

    pub fn prev(&self) -> Option<Value> {
        self.with_array(ArrayBuffer::prev)
    }

    pub fn reset(&self) -> Option<Value> {
        self.with_array(ArrayBuffer::reset)
    }

    pub fn end(&self) -> Option<Value> {
        self.with_array(ArrayBuffer::end)
    }

    pub fn valid(&self) -> bool {
        self.with_array(|buf| Some(buf.valid())).unwrap_or(false)
    }

    pub fn cursor_state(&self) -> CursorState {
        self.with_array(|buf| Some(buf.cursor_state()))
            .unwrap_or(CursorState::PastLast)
    }
}

impl Cursor for Handle {
    fn reset(&mut self) -> Option<Value> {
        Handle::reset(self)
    }

    fn next(&mut self) -> Option<Value> {
        Handle::next(self)
    }

    fn current(&self) -> Option<Value> {
        Handle::current(self)
    }

    fn key(&self) -> Option<Key> {
        Handle::key(self)
    }

    fn valid(&self) -> bool {
        Handle::valid(self)
    }
}

/// Make `slot` a uniquely owned array, autovivifying null
fn writable_array(slot: &mut Value) -> ContainerResult<&mut ArrayBuffer> {
    if slot.is_null() {
        *slot = Value::empty_array();
    }
    match slot {
        Value::Array(buf) => Ok(ArrayBuffer::make_owned(buf)),
        other => Err(ContainerError::Type(format!(
            "cannot use a {} value as an array",
            other.type_name()
        ))),
    }
}

fn read_path(value: &Value, path: &[Key]) -> ContainerResult<Value> {
    let Some((head, rest)) = path.split_first() else {
        return Ok(value.clone().dereferenced());
    };
    match value {
        Value::Array(buf) => {
            let child = buf
                .get_raw(head)
                .ok_or_else(|| ContainerError::NotFound(head.clone()))?;
            read_path(child, rest)
        }
        Value::Ref(cell) => cell.with(|inner| read_path(inner, path))?,
        _ => Err(ContainerError::NotFound(head.clone())),
    }
}

fn write_path(slot: &mut Value, path: &[Key], value: Value) -> ContainerResult<()> {
    if let Value::Ref(cell) = slot {
        let cell = cell.clone();
        return cell.with_mut(|inner| write_path(inner, path, value));
    }
    let Some((head, rest)) = path.split_first() else {
        *slot = value.resolved()?;
        return Ok(());
    };
    let buf = writable_array(slot)?;
    if rest.is_empty() {
        return buf.set(head.clone(), value);
    }
    match buf.get_raw_mut(head) {
        Some(child) => write_path(child, rest, value),
        None => {
            let mut fresh = Value::Null;
            write_path(&mut fresh, rest, value)?;
            buf.set(head.clone(), fresh)
        }
    }
}
