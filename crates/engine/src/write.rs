/// Write path: `put()` and `delete()`.
///
/// All mutations flow through this module. Each one encodes a single
/// record, appends it to the active segment, and updates the in-memory
/// index. There is no write buffer: the record is handed to the OS before
/// the call returns, and `sync()` makes it durable.
use anyhow::Result;
use record::Record;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{Engine, IndexEntry};

impl Engine {
    /// Inserts or overwrites a key.
    ///
    /// The record carries the current wall-clock timestamp (seconds); the
    /// index entry reuses it, so the in-memory and on-disk views of "who is
    /// newest" agree.
    ///
    /// # Errors
    ///
    /// Rejects an empty key or a key longer than the format's signed 32-bit
    /// length field; propagates I/O failures from the append.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let record = Record::new(key, value, unix_now()?)?;
        let (segment_id, offset) = self.store.append(&record.encode())?;
        self.index.insert(
            key.to_vec(),
            IndexEntry {
                segment_id,
                value_offset: offset + record.value_offset(),
                value_len: value.len() as u64,
                timestamp: record.timestamp,
            },
        );
        Ok(())
    }

    /// Deletes a key by appending a tombstone.
    ///
    /// Fails with "key not found" if the key is absent — a delete of an
    /// absent key never writes a tombstone. The index entry is removed
    /// before the tombstone append: if the append then fails, the in-memory
    /// state already shows the key as gone, and the next open rebuilds from
    /// whatever actually reached disk.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        if self.index.remove(key).is_none() {
            anyhow::bail!("key not found");
        }
        let record = Record::new_tombstone(key, unix_now()?)?;
        self.store.append(&record.encode())?;
        Ok(())
    }
}

/// Seconds since the Unix epoch, as the record format stores them.
fn unix_now() -> Result<i64> {
    let secs = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    Ok(secs as i64)
}
