//! Pool of C strings handed out to callers.
//!
//! Entries are keyed by the address of the returned buffer, so two calls
//! that produce equal text own two separate entries and each must be
//! released on its own.

use std::collections::HashMap;
use std::ffi::{CString, c_char};

use daqbridge_types::{DaqError, DaqResult};

#[derive(Debug, Default)]
pub struct StringPool {
    entries: HashMap<usize, CString>,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `text` into a new NUL-terminated buffer owned by the pool.
    /// Interior NUL bytes are dropped.
    pub fn intern(&mut self, text: impl Into<String>) -> *const c_char {
        let bytes: Vec<u8> = text.into().into_bytes().into_iter().filter(|&b| b != 0).collect();
        let owned = CString::new(bytes).unwrap_or_default();
        let ptr = owned.as_ptr();
        self.entries.insert(ptr as usize, owned);
        ptr
    }

    pub fn contains(&self, ptr: *const c_char) -> bool {
        self.entries.contains_key(&(ptr as usize))
    }

    /// # Errors
    ///
    /// [`DaqError::InvalidHandle`] if `ptr` is not a live pool entry.
    pub fn release(&mut self, ptr: *const c_char) -> DaqResult<()> {
        self.entries
            .remove(&(ptr as usize))
            .map(|_| ())
            .ok_or(DaqError::InvalidHandle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn equal_text_gets_separate_entries() {
        let mut pool = StringPool::new();
        let a = pool.intern("same");
        let b = pool.intern("same");
        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);
        pool.release(a).unwrap();
        assert!(pool.contains(b));
        let text = unsafe { CStr::from_ptr(b) };
        assert_eq!(text.to_str().unwrap(), "same");
    }

    #[test]
    fn release_twice_fails() {
        let mut pool = StringPool::new();
        let p = pool.intern("x");
        pool.release(p).unwrap();
        assert!(pool.release(p).is_err());
        assert!(pool.is_empty());
    }

    #[test]
    fn interior_nul_is_dropped() {
        let mut pool = StringPool::new();
        let p = pool.intern("a\0b");
        let text = unsafe { CStr::from_ptr(p) };
        assert_eq!(text.to_bytes(), b"ab");
    }
}
