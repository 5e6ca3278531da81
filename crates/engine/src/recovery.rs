/// Startup index rebuild.
///
/// This module handles the cold-start path: every segment is replayed from
/// offset 0 and the index is rebuilt record by record. There is no separate
/// index file or manifest — the segments are the only source of truth.
use anyhow::Result;
use segment::SegmentStore;
use std::collections::HashMap;

use crate::IndexEntry;

/// Rebuilds the key index by scanning every segment.
///
/// Segments are walked in sorted-id order, which equals creation order
/// because segment names are zero-padded timestamps. A record replaces the
/// current entry for its key when its timestamp is greater than *or equal
/// to* the stored one: with the deterministic walk order, the last record
/// written always wins, even when several writes share one wall-clock
/// second.
///
/// Tombstones participate in the walk like any other record (their
/// zero-length value overrides older live entries) and are purged at the
/// end, so a deleted key comes back absent.
///
/// # Errors
///
/// Propagates scan failures: corruption (CRC or version) in any segment
/// aborts the rebuild and therefore the open. A torn record at a segment
/// tail is not an error; the scan stops there cleanly.
pub(crate) fn build_index(store: &mut SegmentStore) -> Result<HashMap<Vec<u8>, IndexEntry>> {
    let mut index: HashMap<Vec<u8>, IndexEntry> = HashMap::new();

    let mut ids = store.segment_ids();
    ids.sort();

    for id in &ids {
        store.scan(id, |offset, record| {
            let newest = match index.get(&record.key) {
                Some(existing) => record.timestamp >= existing.timestamp,
                None => true,
            };
            if newest {
                let entry = IndexEntry {
                    segment_id: id.clone(),
                    value_offset: offset + record.value_offset(),
                    value_len: record.value.len() as u64,
                    timestamp: record.timestamp,
                };
                index.insert(record.key, entry);
            }
        })?;
    }

    // A zero-length value means "key is absent"; only now that every
    // segment has been walked is it safe to forget those keys.
    index.retain(|_, entry| entry.value_len > 0);

    Ok(index)
}
