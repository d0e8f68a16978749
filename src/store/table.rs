//! KvStore implementation
//!
//! HashMap-based store with RwLock for concurrency.

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::error::Result;

/// Concurrent mapping from string keys to byte values
#[derive(Debug, Default)]
pub struct KvStore {
    data: RwLock<HashMap<String, Bytes>>,
}

impl KvStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a value (write lock)
    ///
    /// Never fails for the in-memory map; the `Result` leaves room for
    /// bounded backends.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Bytes>) -> Result<()> {
        self.data.write().insert(key.into(), value.into());
        Ok(())
    }

    /// Look up a value (read lock)
    ///
    /// `None` when the key was never set. `Bytes` clones are reference
    /// counted, so the lock is not held while the caller uses the value.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.data.read().get(key).cloned()
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}
