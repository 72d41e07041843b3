//! Reference cells - the shared slot behind an alias group.
//!
//! A `Reference` is what `$a =& $b` makes two variables agree on: one
//! mutable slot holding one value. Cloning a `Reference` joins the same
//! slot; it never copies the value.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::warn;

use super::Value;
use crate::runtime::errors::{ContainerError, ContainerResult};

#[derive(Clone)]
pub struct Reference(Rc<RefCell<Value>>);

impl Reference {
    pub fn new(value: Value) -> Self {
        Reference(Rc::new(RefCell::new(value.dereferenced())))
    }

    /// Copy the current value out of the slot (O(1) for containers).
    ///
    /// A slot that is mid-write (only reachable through a self-referencing
    /// container) reads as null.
    pub fn get(&self) -> Value {
        match self.0.try_borrow() {
            Ok(slot) => slot.clone(),
            Err(_) => {
                warn!(target: "arrayrt::reference", addr = self.addr(), "read of a slot that is being written");
                Value::Null
            }
        }
    }

    /// Copy the current value out, failing on a slot that is mid-write
    pub(crate) fn try_get(&self) -> ContainerResult<Value> {
        self.with(Value::clone)
    }

    /// Replace the slot's value; every alias observes the new value.
    ///
    /// Storing a reference into a reference stores the target's value,
    /// so slots never chain.
    pub fn set(&self, value: Value) -> ContainerResult<()> {
        let value = value.resolved()?;
        self.with_mut(|slot| {
            *slot = value;
            Ok(())
        })
    }

    /// Run `f` with mutable access to the slot.
    ///
    /// Fails with `CyclicReference` when the slot is already being written
    /// further up the call stack (a container that references itself).
    pub(crate) fn with_mut<R>(
        &self,
        f: impl FnOnce(&mut Value) -> ContainerResult<R>,
    ) -> ContainerResult<R> {
        let mut slot = self
            .0
            .try_borrow_mut()
            .map_err(|_| ContainerError::CyclicReference)?;
        f(&mut slot)
    }

    /// Run `f` with shared access to the slot.
    pub(crate) fn with<R>(&self, f: impl FnOnce(&Value) -> R) -> ContainerResult<R> {
        let slot = self
            .0
            .try_borrow()
            .map_err(|_| ContainerError::CyclicReference)?;
        Ok(f(&slot))
    }

    /// True if both references denote the same slot
    pub fn ptr_eq(&self, other: &Reference) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of holders of this slot (handles and container entries)
    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Stable identity used by cycle-safe traversals
    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

// Identity only: printing the slot's contents could recurse forever
// through a self-referencing container.
impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("addr", &format_args!("{:#x}", self.addr()))
            .field("holders", &self.strong_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_slot() {
        let a = Reference::new(Value::Int(1));
        let b = a.clone();
        b.set(Value::Int(2)).unwrap();
        assert_eq!(a.get(), Value::Int(2));
        assert!(a.ptr_eq(&b));
        assert_eq!(a.strong_count(), 2);
    }

    #[test]
    fn test_set_never_chains_references() {
        let target = Reference::new(Value::from("x"));
        let slot = Reference::new(Value::Null);
        slot.set(Value::Ref(target.clone())).unwrap();
        assert_eq!(slot.get(), Value::from("x"));
        assert!(!matches!(slot.get(), Value::Ref(_)));
    }

    #[test]
    fn test_reentrant_write_is_an_error() {
        let slot = Reference::new(Value::Int(0));
        let result = slot.with_mut(|_| slot.with_mut(|_| Ok(())));
        assert_eq!(result, Err(ContainerError::CyclicReference));
    }

    #[test]
    fn test_storing_own_slot_mid_write_is_an_error() {
        let slot = Reference::new(Value::Int(7));
        let result = slot.with_mut(|_| Value::Ref(slot.clone()).resolved());
        assert_eq!(result, Err(ContainerError::CyclicReference));
        assert_eq!(slot.try_get(), Ok(Value::Int(7)));
        // Plain reads still degrade to null
        let read = slot.with_mut(|_| Ok(slot.get()));
        assert_eq!(read, Ok(Value::Null));
    }
}
