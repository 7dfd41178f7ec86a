//! Bounded pools of canned replies with two selection disciplines.

use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// Error constructing a pool from its source entries.
#[derive(Error, Debug)]
pub enum PoolError {
    /// The source held no entries at all.
    #[error("response pool `{0}` is empty")]
    Empty(&'static str),
    /// The source held an entry with no usable text.
    #[error("response pool `{0}` contains a blank entry")]
    Blank(&'static str),
}

/// An immutable, non-empty pool of reply strings.
///
/// `next` cycles through the entries with a single cursor shared across all
/// users; `random` draws independently on every call. The cursor lives in
/// memory only. Wrap-around order is reply variety, not correctness, so a
/// restart starting the cycle over is fine.
#[derive(Debug)]
pub struct ResponsePool {
    name: &'static str,
    entries: Vec<String>,
    cursor: AtomicUsize,
}

impl ResponsePool {
    /// Builds a pool, validating the entries.
    ///
    /// # Errors
    ///
    /// Returns a `PoolError` if `entries` is empty or any entry is blank.
    pub fn new(name: &'static str, entries: Vec<String>) -> Result<Self, PoolError> {
        if entries.is_empty() {
            return Err(PoolError::Empty(name));
        }
        if entries.iter().any(|e| e.trim().is_empty()) {
            return Err(PoolError::Blank(name));
        }
        Ok(Self {
            name,
            entries,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Round-robin selection: returns the entry under the shared cursor and
    /// advances it. The increment is atomic, so concurrent callers never
    /// lose an advance, and the modulo keeps the wrapping cursor in range.
    pub fn next(&self) -> &str {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.entries.len();
        &self.entries[index]
    }

    /// Uniform random selection, independent of the round-robin cursor.
    pub fn random(&self) -> &str {
        let index = rand::thread_rng().gen_range(0..self.entries.len());
        &self.entries[index]
    }

    /// Name this pool was loaded under, for diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Number of entries in the pool. Never zero.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool holds no entries. Always false for a constructed
    /// pool; `new` rejects empty sources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
