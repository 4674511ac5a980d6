//! Engine Module
//!
//! The log handle: owns the open file, the position index and the write
//! offset, and serves every caller-visible operation on them.
//!
//! ## Responsibilities
//! - Run recovery once at open, before anything else can touch the file
//! - Append frames at the write offset and index them
//! - Give callers explicit control over durability (append vs. sync)
//! - Truncate a suffix of the log for conflict resolution
//! - Reject everything after close

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::config::WalConfig;
use crate::error::{Result, WalError};
use crate::metrics::{MetricsSnapshot, WalMetrics};
use crate::wal::io::{sync_dir, write_all_at};
use crate::wal::{
    compute_checksum, encode_frame, read_frame_at, EntryIndex, EntryType, FrameRead,
    RecoveryResult, Recovered, WalRecovery,
};

/// Tail of the file, owned by whoever holds the write lock
#[derive(Debug)]
struct TailState {
    /// Where the next frame starts: the end of the last valid frame
    offset: u64,
    /// Log index the next append will be assigned
    next_index: u64,
}

/// A durable, append-only log in a single file
///
/// ## Concurrency Model
///
/// Three independent locks, always taken in this order:
///
/// - **`tail`** (Mutex): write discipline. Held by append, sync, truncate and
///   close, so at most one of them touches the file tail at a time.
/// - **`index`** (RwLock): the position index. Lookups take a read lock,
///   copy what they need out and release it once the file lock is held;
///   no file I/O happens under it.
/// - **`file`** (RwLock): body reads. Readers share it while verifying
///   frames; writers take it exclusively while bytes are in flight, so a
///   reader never observes a half-written frame.
///
/// `closed` is an atomic flag checked before any lock is taken.
pub struct Wal {
    /// Path of the log file
    path: PathBuf,

    /// Limits and recovery policy
    config: WalConfig,

    /// Open file handle; `None` once closed
    file: RwLock<Option<File>>,

    /// Serializes tail mutations
    tail: Mutex<TailState>,

    /// Frame offsets in log order
    index: RwLock<EntryIndex>,

    closed: AtomicBool,

    metrics: WalMetrics,

    /// What the open-time scan found
    recovery: RecoveryResult,
}

impl Wal {
    /// Open or create a log with default limits
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, WalConfig::default())
    }

    /// Open or create a log
    ///
    /// On startup:
    /// 1. Create the parent directory if needed
    /// 2. Open the file, making a newly created directory entry durable
    /// 3. Write the header (new file) or recover (existing file)
    /// 4. Ready to serve requests
    pub fn open_with_config(path: impl AsRef<Path>, config: WalConfig) -> Result<Self> {
        config.validate()?;

        let path = path.as_ref().to_path_buf();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let existed = path.exists();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        if !existed {
            sync_dir(&dir)?;
        }

        let metrics = WalMetrics::new();
        let Recovered {
            index,
            write_offset,
            result,
        } = WalRecovery::recover(&file, &config, &metrics)?;

        tracing::info!(
            path = %path.display(),
            entries = result.entries_recovered,
            truncated = result.was_truncated,
            "opened WAL"
        );

        Ok(Self {
            path,
            config,
            file: RwLock::new(Some(file)),
            tail: Mutex::new(TailState {
                offset: write_offset,
                next_index: index.last_index() + 1,
            }),
            index: RwLock::new(index),
            closed: AtomicBool::new(false),
            metrics,
            recovery: result,
        })
    }

    // =========================================================================
    // Write Path
    // =========================================================================

    /// Append a record without forcing it to stable storage
    ///
    /// Returns the log index assigned to it. The record is readable through
    /// this handle as soon as this returns.
    pub fn append(&self, data: &[u8]) -> Result<u64> {
        self.ensure_open()?;
        self.check_size(data)?;

        let mut tail = self.tail.lock();
        self.append_locked(&mut tail, data)
    }

    /// Force everything written so far to stable storage
    pub fn sync(&self) -> Result<()> {
        self.ensure_open()?;

        let _tail = self.tail.lock();
        self.sync_locked()
    }

    /// Append, then sync, without letting another writer in between
    ///
    /// If the append fails the sync is not attempted.
    pub fn append_and_sync(&self, data: &[u8]) -> Result<u64> {
        self.ensure_open()?;
        self.check_size(data)?;

        let mut tail = self.tail.lock();
        let index = self.append_locked(&mut tail, data)?;
        self.sync_locked()?;
        Ok(index)
    }

    /// Discard `index` and every record after it (1-based)
    ///
    /// Keeps `1..index`. The file is physically shrunk and the shrink is made
    /// durable before this returns; the next append is assigned `index` and
    /// lands exactly where the discarded record began.
    pub fn truncate_from_index(&self, index: u64) -> Result<()> {
        self.ensure_open()?;

        let mut tail = self.tail.lock();
        let mut entries = self.index.write();

        let len = entries.len();
        let truncate_offset = entries
            .offset_of(index)
            .ok_or(WalError::InvalidTruncateIndex { index, len })?;

        {
            let guard = self.file.write();
            let file = guard.as_ref().ok_or(WalError::Closed)?;

            file.set_len(truncate_offset)?;

            // The file is already shorter; keep memory in step with it even
            // if making the shrink durable fails.
            entries.truncate_from(index);
            tail.offset = truncate_offset;
            tail.next_index = index;

            file.sync_all()?;
        }

        tracing::debug!(
            from_index = index,
            offset = truncate_offset,
            removed = len - (index - 1),
            "truncated WAL"
        );
        Ok(())
    }

    /// Release the file after a best-effort final sync
    ///
    /// Idempotent: later calls return `Ok(())` without doing anything.
    pub fn close(&self) -> Result<()> {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        let _tail = self.tail.lock();
        let file = self.file.write().take();
        if let Some(file) = file {
            match file.sync_all() {
                Ok(()) => self.metrics.record_sync(),
                Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "final sync on close failed"),
            }
            drop(file);
        }

        tracing::debug!(path = %self.path.display(), "closed WAL");
        Ok(())
    }

    // =========================================================================
    // Read Path
    // =========================================================================

    /// Payload of the record at `index` (1-based), re-verified from disk
    pub fn get_entry(&self, index: u64) -> Result<Vec<u8>> {
        self.ensure_open()?;

        // The file lock is taken before the index lock is released, so a
        // truncate cannot slip in between the lookup and the read.
        let (offset, guard) = {
            let entries = self.index.read();
            let offset = entries.offset_of(index).ok_or(WalError::IndexOutOfRange {
                index,
                last_index: entries.last_index(),
            })?;
            (offset, self.file.read())
        };

        let file = guard.as_ref().ok_or(WalError::Closed)?;
        self.read_payload(file, offset)
    }

    /// Every payload in log order, as of the moment the index is copied
    ///
    /// Fails as a whole if any frame is unreadable or corrupt.
    pub fn read_all(&self) -> Result<Vec<Vec<u8>>> {
        self.ensure_open()?;

        let (snapshot, guard) = {
            let entries = self.index.read();
            (entries.snapshot(), self.file.read())
        };
        let file = guard.as_ref().ok_or(WalError::Closed)?;

        let mut results = Vec::with_capacity(snapshot.len());
        for entry in snapshot {
            results.push(self.read_payload(file, entry.offset)?);
        }
        Ok(results)
    }

    /// Highest valid log index, or 0 when the log is empty
    pub fn last_index(&self) -> u64 {
        self.index.read().last_index()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Number of records in the log
    pub fn len(&self) -> u64 {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    /// Byte offset where the next frame will be written
    pub fn write_offset(&self) -> u64 {
        self.tail.lock().offset
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &WalConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Current counter values
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// What recovery found when this handle was opened
    pub fn recovery_result(&self) -> &RecoveryResult {
        &self.recovery
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(WalError::Closed);
        }
        Ok(())
    }

    fn check_size(&self, data: &[u8]) -> Result<()> {
        if data.len() > self.config.max_entry_size as usize {
            return Err(WalError::EntryTooLarge {
                size: data.len(),
                max: self.config.max_entry_size,
            });
        }
        Ok(())
    }

    fn append_locked(&self, tail: &mut TailState, data: &[u8]) -> Result<u64> {
        let entry_type = EntryType::Data as u8;
        let frame = encode_frame(entry_type, data, compute_checksum(entry_type, data));
        let frame_offset = tail.offset;

        {
            let guard = self.file.write();
            let file = guard.as_ref().ok_or(WalError::Closed)?;
            if let Err(e) = write_all_at(file, &frame, frame_offset) {
                // Drop whatever part of the frame reached the file
                if let Err(rollback) = file.set_len(frame_offset) {
                    tracing::warn!(offset = frame_offset, error = %rollback, "failed to roll back partial append");
                }
                return Err(e.into());
            }
        }

        let index = self.index.write().push(frame_offset);
        debug_assert_eq!(index, tail.next_index);
        tail.offset += frame.len() as u64;
        tail.next_index = index + 1;

        self.metrics.record_write(frame.len() as u64);

        if tail.offset > self.config.max_segment_size {
            tracing::warn!(
                size = tail.offset,
                max = self.config.max_segment_size,
                "WAL file has grown past max_segment_size"
            );
        }
        tracing::trace!(index, offset = frame_offset, len = data.len(), "appended entry");

        Ok(index)
    }

    fn sync_locked(&self) -> Result<()> {
        let guard = self.file.read();
        let file = guard.as_ref().ok_or(WalError::Closed)?;
        file.sync_all()?;
        self.metrics.record_sync();
        Ok(())
    }

    fn read_payload(&self, file: &File, offset: u64) -> Result<Vec<u8>> {
        match read_frame_at(file, offset, self.config.max_entry_size)? {
            FrameRead::Valid { entry, .. } => Ok(entry.data),
            other => {
                if matches!(other, FrameRead::ChecksumMismatch { .. }) {
                    self.metrics.record_corruption();
                    tracing::warn!(path = %self.path.display(), offset, "checksum mismatch on read");
                }
                Err(other.into_error(offset))
            }
        }
    }
}

impl Drop for Wal {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
