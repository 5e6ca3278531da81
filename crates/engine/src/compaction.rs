/// Compaction: rewrites every live key into fresh segments and unlinks the
/// old ones, reclaiming the space held by superseded values and tombstones.
use anyhow::Result;
use record::Record;
use tracing::debug;

use crate::{Engine, IndexEntry};

impl Engine {
    /// Merges the store down to one record per live key.
    ///
    /// # Steps
    ///
    /// 1. Force a rotation, so every pre-merge record sits in an immutable
    ///    segment and the fresh active segment receives only merged output.
    /// 2. For each live key (sorted, for a reproducible layout): read the
    ///    current value, re-encode it with its **original** timestamp, and
    ///    append it through the normal write path. The index entry is
    ///    repointed as soon as the append lands.
    /// 3. Sync, then remove the stale segments.
    ///
    /// The merged output may span several segments if it outgrows the
    /// rotation threshold. Tombstones and superseded values are simply not
    /// rewritten; deleting the stale segments is what reclaims their bytes.
    /// Keys deleted before the merge stay absent after it and after any
    /// reopen, because no record for them survives.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures. If the rewrite fails midway the index still
    /// points every key at a valid record (old segments are only removed
    /// after the sync succeeds), so the store remains readable.
    pub fn merge(&mut self) -> Result<()> {
        self.store.rotate()?;
        let merged_into = self.store.active_id().to_string();

        let stale: Vec<String> = self
            .store
            .segment_ids()
            .into_iter()
            .filter(|id| *id != merged_into)
            .collect();

        let mut keys: Vec<Vec<u8>> = self.index.keys().cloned().collect();
        keys.sort();

        let mut rewritten = 0usize;
        for key in keys {
            let entry = match self.index.get(&key) {
                Some(e) => e.clone(),
                None => continue,
            };
            if !stale.contains(&entry.segment_id) {
                continue;
            }
            let value = self
                .store
                .read(&entry.segment_id, entry.value_offset, entry.value_len)?;
            let record = Record::new(&key, &value, entry.timestamp)?;
            let (segment_id, offset) = self.store.append(&record.encode())?;
            self.index.insert(
                key,
                IndexEntry {
                    segment_id,
                    value_offset: offset + record.value_offset(),
                    value_len: entry.value_len,
                    timestamp: entry.timestamp,
                },
            );
            rewritten += 1;
        }

        // Durability point: the merged records must be on disk before the
        // only other copy of the data disappears.
        self.store.sync()?;

        for id in &stale {
            self.store.remove(id)?;
        }

        debug!(
            keys = rewritten,
            dropped_segments = stale.len(),
            "merge complete"
        );
        Ok(())
    }
}
