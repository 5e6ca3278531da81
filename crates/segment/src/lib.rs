//! # Segment — Append-Only Segment Files
//!
//! Owns the data directory of a DriftKV store. All writes go to a single
//! *active* segment file; once that file crosses the rotation threshold a
//! fresh active segment is created and the old one becomes immutable. Every
//! segment (the active one included) also has a read-only handle in a map
//! keyed by segment id, serving the positional reads issued by the engine.
//!
//! Segments created by this store are named `data-<unix-seconds>-<seq>.db`,
//! the timestamp zero-padded to 10 digits and the sequence number to the
//! full 20 digits of a `u64`, so lexicographic order over segment ids
//! equals creation order no matter how many rotations happen — the index
//! rebuild relies on this. The sequence number also makes two rotations
//! within the same wall-clock second produce distinct names. Discovery is
//! broader than the naming convention: any `*.db` file in the directory is
//! picked up as a segment.
//!
//! The scanner decodes records itself and hands `(offset, record)` pairs to
//! the caller. A record that ends past the end of the file is a torn append
//! from a crashed session: the scan logs a warning and halts cleanly. A CRC
//! or version failure on a fully-present record propagates as an error.

use record::{Record, RecordError};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, warn};

/// Size above which the next append rotates to a fresh segment (100 MiB).
pub const DEFAULT_ROTATE_THRESHOLD: u64 = 100 * 1024 * 1024;

const SEGMENT_PREFIX: &str = "data-";
const SEGMENT_SUFFIX: &str = ".db";

/// Errors from segment file operations.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// An underlying filesystem error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The named segment is not in the read map.
    #[error("unknown segment: {0}")]
    UnknownSegment(String),

    /// A positional read returned fewer bytes than requested.
    #[error("short read in segment {segment}: wanted {wanted} bytes at offset {offset}, got {got}")]
    ShortRead {
        segment: String,
        offset: u64,
        wanted: u64,
        got: u64,
    },

    /// A record failed to decode during a scan.
    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Manager for the directory of append-only segment files.
pub struct SegmentStore {
    dir: PathBuf,
    /// Read-only handle per known segment, the active one included.
    readers: HashMap<String, File>,
    /// Append handle for the active segment.
    active: File,
    active_id: String,
    rotate_threshold: u64,
    /// Monotonic suffix for segment names created by this store.
    name_seq: u64,
}

impl SegmentStore {
    /// Opens (or creates) the data directory and starts a fresh active
    /// segment.
    ///
    /// Pre-existing `*.db` files are opened read-only. Zero-length files
    /// other than the new active segment are leftovers from sessions that
    /// never wrote anything; they are unlinked eagerly.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, SegmentError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let mut name_seq = 0u64;
        let (active_id, active) = create_segment(&dir, &mut name_seq)?;

        let mut readers = HashMap::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            let name = match segment_name(&path) {
                Some(n) => n,
                None => continue,
            };
            let file = File::open(&path)?;
            if file.metadata()?.len() == 0 && name != active_id {
                drop(file);
                fs::remove_file(&path)?;
                debug!(segment = %name, "removed empty leftover segment");
                continue;
            }
            readers.insert(name, file);
        }

        Ok(Self {
            dir,
            readers,
            active,
            active_id,
            rotate_threshold: DEFAULT_ROTATE_THRESHOLD,
            name_seq,
        })
    }

    /// Appends `bytes` as a single write to the active segment, rotating
    /// first if the segment has outgrown the threshold.
    ///
    /// Returns the id of the segment written to and the offset of the first
    /// appended byte. A record is never split across two segments: the
    /// rotation check happens before the write, so each append lands whole
    /// in exactly one file.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(String, u64), SegmentError> {
        let mut size = self.active.metadata()?.len();
        if size > self.rotate_threshold {
            self.rotate()?;
            size = 0;
        }
        self.active.write_all(bytes)?;
        Ok((self.active_id.clone(), size))
    }

    /// Retires the current active segment and starts a fresh one.
    ///
    /// The old segment keeps its read handle and becomes immutable; its
    /// append handle is closed. Called automatically by [`append`] at the
    /// rotation threshold, and by compaction to fence off pre-merge data.
    ///
    /// [`append`]: SegmentStore::append
    pub fn rotate(&mut self) -> Result<(), SegmentError> {
        let (id, file) = create_segment(&self.dir, &mut self.name_seq)?;
        let reader = File::open(self.dir.join(&id))?;
        self.readers.insert(id.clone(), reader);
        debug!(from = %self.active_id, to = %id, "rotated active segment");
        self.active = file;
        self.active_id = id;
        Ok(())
    }

    /// Reads exactly `len` bytes at `offset` from the named segment.
    pub fn read(&mut self, id: &str, offset: u64, len: u64) -> Result<Vec<u8>, SegmentError> {
        let file = self
            .readers
            .get_mut(id)
            .ok_or_else(|| SegmentError::UnknownSegment(id.to_string()))?;
        file.seek(SeekFrom::Start(offset))?;

        let mut buf = vec![0u8; len as usize];
        let mut filled = 0usize;
        while filled < buf.len() {
            match file.read(&mut buf[filled..])? {
                0 => break,
                n => filled += n,
            }
        }
        if (filled as u64) < len {
            return Err(SegmentError::ShortRead {
                segment: id.to_string(),
                offset,
                wanted: len,
                got: filled as u64,
            });
        }
        Ok(buf)
    }

    /// Walks the named segment from offset 0, calling `visit` with each
    /// record and the offset it starts at.
    ///
    /// The walk advances by each record's encoded length and stops at the
    /// file size. A record cut off by end-of-file is a torn append from a
    /// crashed session: the scan warns and halts cleanly, keeping every
    /// record before the tear. Integrity and version failures propagate.
    pub fn scan<F>(&mut self, id: &str, mut visit: F) -> Result<(), SegmentError>
    where
        F: FnMut(u64, Record),
    {
        let file = self
            .readers
            .get_mut(id)
            .ok_or_else(|| SegmentError::UnknownSegment(id.to_string()))?;
        let size = file.metadata()?.len();
        file.seek(SeekFrom::Start(0))?;
        let mut reader = BufReader::new(&*file);

        let mut pos = 0u64;
        while pos < size {
            match Record::decode(&mut reader) {
                Ok(record) => {
                    let len = record.encoded_len();
                    visit(pos, record);
                    pos += len;
                }
                Err(RecordError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                    warn!(segment = %id, offset = pos, "truncated record at segment tail, halting scan");
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Fsyncs the active segment. Immutable segments were synced (or lost)
    /// when they were active; they never change afterwards.
    pub fn sync(&mut self) -> Result<(), SegmentError> {
        self.active.sync_all()?;
        Ok(())
    }

    /// Closes every handle by consuming the store.
    pub fn close(self) -> Result<(), SegmentError> {
        // File handles close on drop; nothing is buffered in userspace.
        Ok(())
    }

    /// Unlinks a segment from disk and drops its read handle.
    ///
    /// Must not be called on the active segment; compaction rotates first so
    /// every segment it removes is immutable.
    pub fn remove(&mut self, id: &str) -> Result<(), SegmentError> {
        if self.readers.remove(id).is_none() {
            return Err(SegmentError::UnknownSegment(id.to_string()));
        }
        fs::remove_file(self.dir.join(id))?;
        debug!(segment = %id, "removed segment");
        Ok(())
    }

    /// Ids of every known segment, the active one included. Unordered.
    pub fn segment_ids(&self) -> Vec<String> {
        self.readers.keys().cloned().collect()
    }

    /// Id of the segment currently open for appending.
    pub fn active_id(&self) -> &str {
        &self.active_id
    }

    /// Current rotation threshold in bytes.
    pub fn rotate_threshold(&self) -> u64 {
        self.rotate_threshold
    }

    /// Overrides the rotation threshold. Useful for testing and tuning.
    pub fn set_rotate_threshold(&mut self, bytes: u64) {
        self.rotate_threshold = bytes;
    }
}

impl std::fmt::Debug for SegmentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentStore")
            .field("dir", &self.dir)
            .field("segments", &self.readers.len())
            .field("active_id", &self.active_id)
            .field("rotate_threshold", &self.rotate_threshold)
            .finish()
    }
}

/// Extracts the segment id from a path. Every `*.db` file counts as a
/// segment, whatever session (or tool) named it.
fn segment_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    if name.ends_with(SEGMENT_SUFFIX) {
        Some(name.to_string())
    } else {
        None
    }
}

/// Creates a new empty segment with a unique zero-padded name and returns
/// its id and append handle.
fn create_segment(dir: &Path, name_seq: &mut u64) -> Result<(String, File), SegmentError> {
    loop {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        // The sequence carries the full 20 digits of a u64: lexicographic
        // order over names must equal creation order for any segment count.
        let name = format!("{}{:010}-{:020}{}", SEGMENT_PREFIX, secs, *name_seq, SEGMENT_SUFFIX);
        *name_seq += 1;

        // create_new makes the claim on the name atomic; a clash with a file
        // from an earlier session just bumps the counter and retries.
        match OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(dir.join(&name))
        {
            Ok(file) => return Ok((name, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
}
