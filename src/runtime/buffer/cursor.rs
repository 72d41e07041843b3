//! Iteration cursor operations for ArrayBuffer.
//!
//! The cursor lives inside the buffer, not in any variable, so every holder
//! of the same `Rc<ArrayBuffer>` observes the same position. Moving the
//! cursor never forks a shared buffer.

use super::ArrayBuffer;
use crate::runtime::models::{Key, Value};

/// Uniform iteration protocol shared by containers and the store iterator.
///
/// `None` stands for the undefined value returned past the last entry.
pub trait Cursor {
    /// Rewind to the first entry and return it
    fn reset(&mut self) -> Option<Value>;
    /// Advance, returning the new current value
    fn next(&mut self) -> Option<Value>;
    fn current(&self) -> Option<Value>;
    fn key(&self) -> Option<Key>;
    fn valid(&self) -> bool;
}

/// Observable cursor state.
///
/// A rewound cursor resolves to its first entry, so it reports `At(0)` on a
/// non-empty buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// At the entry with this ordinal (0-based, in iteration order)
    At(usize),
    PastLast,
}

impl ArrayBuffer {
    /// First live slot at or after `pos`
    pub(super) fn resolve(&self, pos: usize) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .skip(pos)
            .find_map(|(i, slot)| slot.as_ref().map(|_| i))
    }

    pub fn current(&self) -> Option<Value> {
        let pos = self.resolve(self.cursor.get())?;
        self.slots[pos]
            .as_ref()
            .map(|(_, v)| v.clone().dereferenced())
    }

    pub fn key(&self) -> Option<Key> {
        let pos = self.resolve(self.cursor.get())?;
        self.slots[pos].as_ref().map(|(k, _)| k.clone())
    }

    /// Advance past the current entry. Past the end this is a no-op.
    pub fn next(&self) -> Option<Value> {
        let pos = self.resolve(self.cursor.get())?;
        self.cursor.set(pos + 1);
        self.current()
    }

    /// Step back to the previous entry, or past-last if there is none
    pub fn prev(&self) -> Option<Value> {
        let pos = self.resolve(self.cursor.get())?;
        let previous = self.slots[..pos].iter().rposition(Option::is_some);
        self.cursor.set(previous.unwrap_or(self.slots.len()));
        self.current()
    }

    pub fn reset(&self) -> Option<Value> {
        self.cursor.set(0);
        self.current()
    }

    /// Move to the last entry and return it
    pub fn end(&self) -> Option<Value> {
        let last = self.slots.iter().rposition(Option::is_some);
        self.cursor.set(last.unwrap_or(self.slots.len()));
        self.current()
    }

    pub fn valid(&self) -> bool {
        self.resolve(self.cursor.get()).is_some()
    }

    pub fn cursor_state(&self) -> CursorState {
        match self.resolve(self.cursor.get()) {
            Some(pos) => CursorState::At(self.slots[..pos].iter().flatten().count()),
            None => CursorState::PastLast,
        }
    }

    /// Drain any cursor into a fresh buffer, preserving its order.
    ///
    /// The source is rewound first and left past its last entry.
    pub fn from_cursor<C: Cursor + ?Sized>(source: &mut C) -> ArrayBuffer {
        let mut buf = ArrayBuffer::new();
        source.reset();
        while source.valid() {
            if let (Some(key), Some(value)) = (source.key(), source.current()) {
                buf.put(key, value.dereferenced());
            }
            source.next();
        }
        buf
    }
}

impl Cursor for ArrayBuffer {
    fn reset(&mut self) -> Option<Value> {
        ArrayBuffer::reset(self)
    }

    fn next(&mut self) -> Option<Value> {
        ArrayBuffer::next(self)
    }

    fn current(&self) -> Option<Value> {
        ArrayBuffer::current(self)
    }

    fn key(&self) -> Option<Key> {
        ArrayBuffer::key(self)
    }

    fn valid(&self) -> bool {
        ArrayBuffer::valid(self)
    }
}
