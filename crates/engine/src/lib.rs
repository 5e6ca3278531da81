//! # Engine — DriftKV Storage Engine
//!
//! The central orchestrator that ties the [`record`] codec and the
//! [`segment`] file manager into a complete Bitcask-style key-value store.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   |
//!   v
//! ┌─────────────────────────────────────────────┐
//! │                  ENGINE                     │
//! │                                             │
//! │ write.rs → encode record → append → index   │
//! │                                             │
//! │ read.rs  → index lookup → positional read   │
//! │                                             │
//! │ recovery.rs → scan every segment → index    │
//! │                                             │
//! │ compaction.rs → rewrite live keys → drop    │
//! │                 stale segments              │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module         | Purpose                                            |
//! |----------------|----------------------------------------------------|
//! | `lib.rs`       | `Engine` struct, open, accessors, `Debug`, `Drop`  |
//! | [`read`]       | `get()`, `list_keys()`                             |
//! | [`write`]      | `put()`, `delete()`                                |
//! | [`recovery`]   | startup index rebuild from the segment files       |
//! | [`compaction`] | `merge()` — rewrite live keys, reclaim dead bytes  |
//!
//! ## Data Flow
//!
//! Every `put` appends one record to the active segment and points the
//! in-memory index at the value's byte range. Every `get` is one index
//! lookup plus one positional read. A `delete` removes the index entry and
//! appends a tombstone so the deletion survives restarts. On open, the
//! index is rebuilt by replaying every segment; the newest record per key
//! wins and tombstones erase their key.
//!
//! ## Crash Safety
//!
//! A write is durable once `sync()` returns. A crash mid-append leaves a
//! torn record at the tail of the active segment; the next open detects it
//! (the record's byte range runs past end-of-file) and mounts everything
//! before the tear. CRC failures on fully-present records are treated as
//! real corruption and abort the open.
//!
//! The engine is single-threaded by design: one caller, no internal locks.
//! Callers needing concurrency must serialize access externally.

mod compaction;
mod read;
mod recovery;
mod write;

use anyhow::Result;
use segment::SegmentStore;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Where a key's latest value lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IndexEntry {
    /// Segment file holding the value.
    pub segment_id: String,
    /// Absolute offset of the first value byte within the segment.
    pub value_offset: u64,
    /// Value length in bytes. Zero marks a logically deleted key; such
    /// entries never survive an index rebuild.
    pub value_len: u64,
    /// Timestamp of the record the entry was built from.
    pub timestamp: i64,
}

/// Bitcask-style append-only key-value store.
///
/// # Write Path
///
/// 1. Encode a record with the current wall-clock timestamp.
/// 2. Append it to the active segment (rotating at the size threshold).
/// 3. Point the index entry for the key at the value's byte range.
///
/// # Read Path
///
/// 1. Look the key up in the index.
/// 2. Read exactly `value_len` bytes at `value_offset` from the named
///    segment.
///
/// # Recovery
///
/// [`Engine::open`] replays every segment in creation order and keeps the
/// newest record per key, then purges tombstones.
pub struct Engine {
    pub(crate) store: SegmentStore,
    pub(crate) index: HashMap<Vec<u8>, IndexEntry>,
}

impl Engine {
    /// Opens the store in `dir`, creating the directory if needed, and
    /// rebuilds the in-memory index from the segment files.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors and on corruption in any segment (CRC mismatch
    /// or unknown record version on a fully-present record).
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let mut store = SegmentStore::open(dir)?;
        let index = recovery::build_index(&mut store)?;
        debug!(
            keys = index.len(),
            segments = store.segment_ids().len(),
            active = %store.active_id(),
            "index rebuilt"
        );
        Ok(Self { store, index })
    }

    /// Number of keys currently in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// `true` if no key is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Ids of every segment file, the active one included. Unordered.
    pub fn segment_ids(&self) -> Vec<String> {
        self.store.segment_ids()
    }

    /// Overrides the segment rotation threshold. Useful for testing or
    /// runtime tuning; takes effect on the next append.
    pub fn set_rotate_threshold(&mut self, bytes: u64) {
        self.store.set_rotate_threshold(bytes);
    }

    /// Fsyncs the active segment. A write is guaranteed durable only after
    /// this returns.
    pub fn sync(&mut self) -> Result<()> {
        self.store.sync()?;
        Ok(())
    }

    /// Syncs and shuts the store down, closing every file handle.
    pub fn close(mut self) -> Result<()> {
        self.store.sync()?;
        Ok(())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("keys", &self.index.len())
            .field("segments", &self.store.segment_ids().len())
            .field("active_segment", &self.store.active_id())
            .finish()
    }
}

/// Best-effort sync on drop.
///
/// Errors are ignored because Drop cannot propagate them; callers that need
/// the durability guarantee use [`Engine::sync`] or [`Engine::close`].
impl Drop for Engine {
    fn drop(&mut self) {
        let _ = self.store.sync();
    }
}

#[cfg(test)]
mod tests;
