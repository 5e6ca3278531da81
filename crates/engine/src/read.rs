/// Read path: `get()` and `list_keys()`.
///
/// A point lookup is one index probe plus one positional read of exactly
/// the value's byte range. No record header is re-parsed on the hot path;
/// the index already knows where the value starts and how long it is.
use anyhow::{bail, Result};

use crate::Engine;

impl Engine {
    /// Looks up a key and returns its current value.
    ///
    /// # Errors
    ///
    /// Fails with "key not found" if the key is absent or its index entry
    /// has a zero-length value (tombstones and empty values are
    /// indistinguishable on disk). I/O and short-read failures from the
    /// segment layer propagate.
    pub fn get(&mut self, key: &[u8]) -> Result<Vec<u8>> {
        let entry = match self.index.get(key) {
            Some(e) if e.value_len > 0 => e.clone(),
            _ => bail!("key not found"),
        };
        let value = self
            .store
            .read(&entry.segment_id, entry.value_offset, entry.value_len)?;
        Ok(value)
    }

    /// Returns every key currently in the index. Order is unspecified.
    pub fn list_keys(&self) -> Vec<Vec<u8>> {
        self.index.keys().cloned().collect()
    }
}
