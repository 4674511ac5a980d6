//! WAL Recovery
//!
//! Runs once when a log is opened: validates the file header, replays frames
//! from the first record offset to rebuild the position index, and stops at
//! the first frame that is not fully sound. In [`RecoveryMode::TruncateTail`]
//! the file is cut back to the start of that frame; a structurally sound frame
//! is never discarded and an unsound one is never indexed.

use std::fs::File;
use std::path::Path;

use crate::config::{RecoveryMode, WalConfig};
use crate::error::{Result, WalError};
use crate::metrics::WalMetrics;

use super::entry::FileHeader;
use super::index::EntryIndex;
use super::io::{read_full_at, write_all_at};
use super::reader::{read_file_header, read_frame_at, FrameRead};
use super::FILE_HEADER_SIZE;

/// Result of a recovery (or verification) scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of frames rejected for a checksum mismatch
    pub entries_corrupted: u64,

    /// Last valid log index (0 if none)
    pub last_index: u64,

    /// Whether bytes past the last valid frame were (or, for verify, would be) removed
    pub was_truncated: bool,

    /// Length of the verified prefix: header plus all valid frames
    pub valid_bytes: u64,
}

/// State handed to the log engine after a successful recovery
#[derive(Debug)]
pub(crate) struct Recovered {
    pub index: EntryIndex,
    pub write_offset: u64,
    pub result: RecoveryResult,
}

/// Where a scan ended
#[derive(Debug)]
enum ScanEnd {
    /// No bytes after the last valid frame
    Clean,
    /// Fewer than a frame header's worth of bytes after the last valid frame
    PartialHeader,
    /// A frame starting at `offset` failed validation
    Unsound { offset: u64, reason: FrameRead },
}

struct Scan {
    index: EntryIndex,
    end_offset: u64,
    end: ScanEnd,
}

/// Handles WAL recovery after crash
pub struct WalRecovery;

impl WalRecovery {
    /// Recover an open read/write log file, creating the header if it is empty.
    pub(crate) fn recover(file: &File, config: &WalConfig, metrics: &WalMetrics) -> Result<Recovered> {
        let file_len = file.metadata()?.len();

        if file_len == 0 {
            write_fresh_header(file)?;
            return Ok(Recovered {
                index: EntryIndex::new(),
                write_offset: FILE_HEADER_SIZE as u64,
                result: RecoveryResult {
                    valid_bytes: FILE_HEADER_SIZE as u64,
                    ..RecoveryResult::default()
                },
            });
        }

        if file_len < FILE_HEADER_SIZE as u64 {
            return recover_torn_header(file, file_len, config);
        }

        read_file_header(file)?;

        let scan = scan_frames(file, config.max_entry_size, Some(metrics))?;
        let mut result = RecoveryResult {
            entries_recovered: scan.index.len(),
            entries_corrupted: 0,
            last_index: scan.index.last_index(),
            was_truncated: false,
            valid_bytes: scan.end_offset,
        };

        match scan.end {
            ScanEnd::Clean => {}
            ScanEnd::PartialHeader => {
                // Clean end of log; trim the dangling bytes so the file
                // length matches the write offset.
                if config.recovery_mode == RecoveryMode::TruncateTail {
                    truncate_tail(file, scan.end_offset)?;
                    result.was_truncated = true;
                    tracing::debug!(offset = scan.end_offset, "trimmed partial frame header");
                }
            }
            ScanEnd::Unsound { offset, reason } => {
                if matches!(reason, FrameRead::ChecksumMismatch { .. }) {
                    result.entries_corrupted += 1;
                }
                match config.recovery_mode {
                    RecoveryMode::Strict => return Err(reason.into_error(offset)),
                    RecoveryMode::TruncateTail => {
                        tracing::warn!(
                            offset,
                            reason = ?reason,
                            recovered = result.entries_recovered,
                            "truncating unsound WAL tail"
                        );
                        truncate_tail(file, offset)?;
                        result.was_truncated = true;
                    }
                }
            }
        }

        Ok(Recovered {
            write_offset: scan.end_offset,
            index: scan.index,
            result,
        })
    }

    /// Verify integrity of a WAL file without modifying it
    ///
    /// Reports what opening the log would find; `was_truncated`
    /// means a truncating recovery would cut the file.
    pub fn verify(path: &Path, config: &WalConfig) -> Result<RecoveryResult> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(RecoveryResult::default());
        }
        read_file_header(&file)?;

        let scan = scan_frames(&file, config.max_entry_size, None)?;
        let mut result = RecoveryResult {
            entries_recovered: scan.index.len(),
            entries_corrupted: 0,
            last_index: scan.index.last_index(),
            was_truncated: false,
            valid_bytes: scan.end_offset,
        };
        match scan.end {
            ScanEnd::Clean => {}
            ScanEnd::PartialHeader => result.was_truncated = true,
            ScanEnd::Unsound { reason, .. } => {
                if matches!(reason, FrameRead::ChecksumMismatch { .. }) {
                    result.entries_corrupted = 1;
                }
                result.was_truncated = true;
            }
        }
        Ok(result)
    }
}

/// Replay frames from the first record offset until the first one that is
/// not fully valid.
fn scan_frames(file: &File, max_entry_size: u32, metrics: Option<&WalMetrics>) -> Result<Scan> {
    let mut index = EntryIndex::new();
    let mut offset = FILE_HEADER_SIZE as u64;

    let end = loop {
        match read_frame_at(file, offset, max_entry_size)? {
            FrameRead::Valid { size, .. } => {
                index.push(offset);
                offset += size;
            }
            FrameRead::End => break ScanEnd::Clean,
            FrameRead::PartialHeader { .. } => break ScanEnd::PartialHeader,
            reason => {
                if let (FrameRead::ChecksumMismatch { .. }, Some(metrics)) = (&reason, metrics) {
                    metrics.record_corruption();
                }
                break ScanEnd::Unsound { offset, reason };
            }
        }
    };

    Ok(Scan {
        index,
        end_offset: offset,
        end,
    })
}

fn write_fresh_header(file: &File) -> Result<()> {
    write_all_at(file, &FileHeader::current().encode(), 0)?;
    file.sync_all()?;
    Ok(())
}

fn truncate_tail(file: &File, offset: u64) -> Result<()> {
    file.set_len(offset)?;
    file.sync_all()?;
    Ok(())
}

/// A file shorter than its header is either an interrupted creation (its
/// bytes are a prefix of a valid header) or not a log at all.
fn recover_torn_header(file: &File, file_len: u64, config: &WalConfig) -> Result<Recovered> {
    let mut buf = [0u8; FILE_HEADER_SIZE];
    let got = read_full_at(file, &mut buf[..file_len as usize], 0)?;
    let expected = FileHeader::current().encode();

    if buf[..got] != expected[..got] || config.recovery_mode == RecoveryMode::Strict {
        return Err(WalError::Corrupted(format!(
            "file header is {} bytes, expected {}",
            got, FILE_HEADER_SIZE
        )));
    }

    tracing::warn!(bytes = got, "rewriting torn WAL file header");
    write_fresh_header(file)?;
    Ok(Recovered {
        index: EntryIndex::new(),
        write_offset: FILE_HEADER_SIZE as u64,
        result: RecoveryResult {
            was_truncated: true,
            valid_bytes: FILE_HEADER_SIZE as u64,
            ..RecoveryResult::default()
        },
    })
}
