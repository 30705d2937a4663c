//! String table for efficient storage of symbol-index strings.
//!
//! Uses `Arc<str>` for cheap cloning (reference count increment instead of allocation).
//! The table deduplicates strings so identical strings share the same allocation
//! across every index built in the process.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashSet;

/// Thread-safe string interner with garbage collection of unused strings.
///
/// Interning a string returns an `Arc<str>` that can be cheaply cloned.
/// If the same string is interned multiple times, the same `Arc` is returned.
#[derive(Debug, Default)]
pub struct StringTable {
    strings: Mutex<FxHashSet<Arc<str>>>,
    gc_requested: AtomicBool,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning a cheap-to-clone reference.
    pub fn intern(&self, s: &str) -> Arc<str> {
        let mut strings = self.strings.lock();
        if let Some(existing) = strings.get(s) {
            Arc::clone(existing)
        } else {
            let arc: Arc<str> = Arc::from(s);
            strings.insert(Arc::clone(&arc));
            arc
        }
    }

    /// Get an interned string if it exists, without creating it.
    pub fn get(&self, s: &str) -> Option<Arc<str>> {
        self.strings.lock().get(s).cloned()
    }

    /// Number of unique strings interned.
    pub fn len(&self) -> usize {
        self.strings.lock().len()
    }

    /// Returns true if no strings have been interned.
    pub fn is_empty(&self) -> bool {
        self.strings.lock().is_empty()
    }

    /// Mark the table for collection; [`StringTable::collect_if_requested`] performs it.
    pub fn schedule_gc(&self) {
        self.gc_requested.store(true, Ordering::Release);
    }

    pub fn gc_requested(&self) -> bool {
        self.gc_requested.load(Ordering::Acquire)
    }

    /// Run a pending collection, if one was scheduled. Returns the number of strings dropped.
    pub fn collect_if_requested(&self) -> usize {
        if self.gc_requested.swap(false, Ordering::AcqRel) {
            self.collect_garbage()
        } else {
            0
        }
    }

    /// Drop every string that is referenced only by the table itself.
    pub fn collect_garbage(&self) -> usize {
        let mut strings = self.strings.lock();
        let before = strings.len();
        strings.retain(|s| Arc::strong_count(s) > 1);
        let removed = before - strings.len();
        tracing::debug!(removed, remaining = strings.len(), "string table collected");
        removed
    }
}
