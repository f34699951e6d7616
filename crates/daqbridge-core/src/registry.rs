//! [`HandleRegistry`] – generation-counted slot arena behind the opaque
//! handles given to C callers.
//!
//! A [`Handle`] packs a slot index and the slot's generation into one
//! non-zero machine word. Freeing a handle bumps the slot's generation, so a
//! stale handle never matches a later occupant of the same slot. A slot whose
//! generation would wrap is retired instead of reused.
//!
//! Validity is decided purely by looking the handle up; the word itself is
//! never dereferenced.
//!
//! # Example
//!
//! ```rust
//! use daqbridge_core::registry::HandleRegistry;
//!
//! let mut reg = HandleRegistry::new();
//! let a = reg.insert("first").unwrap();
//! assert!(reg.contains(a));
//! reg.remove(a).unwrap();
//! let b = reg.insert("second").unwrap();
//! assert!(!reg.contains(a));
//! assert_ne!(a, b);
//! ```

use std::num::NonZeroUsize;

use daqbridge_types::{DaqError, DaqResult};

const HALF: u32 = usize::BITS / 2;
const INDEX_MASK: usize = (1 << HALF) - 1;
const MAX_GENERATION: usize = INDEX_MASK;

/// Opaque identity of one registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(NonZeroUsize);

impl Handle {
    fn encode(index: usize, generation: usize) -> Option<Handle> {
        if index >= INDEX_MASK || generation > MAX_GENERATION {
            return None;
        }
        NonZeroUsize::new((generation << HALF) | (index + 1)).map(Handle)
    }

    fn index(self) -> usize {
        (self.0.get() & INDEX_MASK) - 1
    }

    fn generation(self) -> usize {
        self.0.get() >> HALF
    }

    /// The word handed across the C boundary.
    pub fn raw(self) -> usize {
        self.0.get()
    }

    /// Reinterpret a word received from C. Only shape is checked here; use
    /// [`HandleRegistry::contains`] for liveness.
    pub fn from_raw(raw: usize) -> Option<Handle> {
        let nz = NonZeroUsize::new(raw)?;
        if nz.get() & INDEX_MASK == 0 {
            return None;
        }
        Some(Handle(nz))
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: usize,
    value: Option<T>,
}

#[derive(Debug)]
pub struct HandleRegistry<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    live: usize,
}

impl<T> Default for HandleRegistry<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }
}

impl<T> HandleRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` and return its new handle.
    ///
    /// # Errors
    ///
    /// [`DaqError::Generic`] if the handle space is exhausted.
    pub fn insert(&mut self, value: T) -> DaqResult<Handle> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 1,
                    value: None,
                });
                self.slots.len() - 1
            }
        };
        let slot = &mut self.slots[index];
        let handle = Handle::encode(index, slot.generation)
            .ok_or_else(|| DaqError::generic("Handle space exhausted."))?;
        slot.value = Some(value);
        self.live += 1;
        Ok(handle)
    }

    fn slot(&self, handle: Handle) -> Option<&Slot<T>> {
        self.slots
            .get(handle.index())
            .filter(|s| s.generation == handle.generation() && s.value.is_some())
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.slot(handle).is_some()
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slot(handle).and_then(|s| s.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index())
            .filter(|s| s.generation == handle.generation())
            .and_then(|s| s.value.as_mut())
    }

    /// Remove the entry. A second removal of the same handle returns `None`.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        let index = handle.index();
        let slot = self.slots.get_mut(index)?;
        if slot.generation != handle.generation() {
            return None;
        }
        let value = slot.value.take()?;
        self.live -= 1;
        if slot.generation < MAX_GENERATION {
            slot.generation += 1;
            self.free.push(index);
        }
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    #[cfg(test)]
    fn handles(&self) -> Vec<Handle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.value.is_some())
            .filter_map(|(i, s)| Handle::encode(i, s.generation))
            .collect()
    }
}
