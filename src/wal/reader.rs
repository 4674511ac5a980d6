//! WAL Reader
//!
//! Reads frames back from a log file with a bounded two-step read: the fixed
//! 9-byte header first, then (only once the declared length has been checked
//! against the configured maximum) exactly that many payload bytes.

use std::fs::File;
use std::io;
use std::path::Path;

use crate::error::{Result, WalError};

use super::entry::{compute_checksum, FileHeader, FrameHeader, WalEntry};
use super::io::read_full_at;
use super::{ENTRY_HEADER_SIZE, FILE_HEADER_SIZE};

/// Outcome of reading one frame at a known offset
#[derive(Debug)]
pub(crate) enum FrameRead {
    /// Fully verified frame and its total on-disk size
    Valid { entry: WalEntry, size: u64 },
    /// No bytes at all at this offset
    End,
    /// Fewer than 9 bytes remain
    PartialHeader { available: usize },
    /// Declared length exceeds the configured maximum
    TooLarge { length: u32 },
    /// Fewer payload bytes remain than declared
    Torn { declared: u32, available: usize },
    /// Stored checksum does not match the contents
    ChecksumMismatch { expected: u32, actual: u32 },
}

impl FrameRead {
    /// Collapse anything but a valid frame into an error for a frame the
    /// caller expected to find at `offset`.
    pub(crate) fn into_entry(self, offset: u64) -> Result<(WalEntry, u64)> {
        match self {
            FrameRead::Valid { entry, size } => Ok((entry, size)),
            other => Err(other.into_error(offset)),
        }
    }

    /// Error describing why the frame at `offset` cannot be used
    pub(crate) fn into_error(self, offset: u64) -> WalError {
        match self {
            FrameRead::Valid { .. } => WalError::Corrupted(format!(
                "frame at offset {} is valid but was treated as unsound",
                offset
            )),
            FrameRead::End => WalError::Corrupted(format!("no frame at offset {}", offset)),
            FrameRead::PartialHeader { available } => WalError::Corrupted(format!(
                "partial frame header at offset {} ({} of {} bytes)",
                offset, available, ENTRY_HEADER_SIZE
            )),
            FrameRead::TooLarge { length } => WalError::Corrupted(format!(
                "frame at offset {} declares oversized length {}",
                offset, length
            )),
            FrameRead::Torn {
                declared,
                available,
            } => WalError::Corrupted(format!(
                "torn frame at offset {}: {} of {} payload bytes",
                offset, available, declared
            )),
            FrameRead::ChecksumMismatch { expected, actual } => WalError::ChecksumMismatch {
                offset,
                expected,
                actual,
            },
        }
    }
}

/// Read and verify the frame starting at `offset`.
///
/// Only I/O failures are errors here; every structural problem is reported
/// as a [`FrameRead`] variant so recovery can decide what to do with it.
pub(crate) fn read_frame_at(file: &File, offset: u64, max_entry_size: u32) -> io::Result<FrameRead> {
    let mut head = [0u8; ENTRY_HEADER_SIZE];
    let got = read_full_at(file, &mut head, offset)?;
    if got == 0 {
        return Ok(FrameRead::End);
    }
    if got < ENTRY_HEADER_SIZE {
        return Ok(FrameRead::PartialHeader { available: got });
    }

    let header = FrameHeader::decode(&head);
    if header.length > max_entry_size {
        return Ok(FrameRead::TooLarge {
            length: header.length,
        });
    }

    let mut data = vec![0u8; header.length as usize];
    let got = read_full_at(file, &mut data, offset + ENTRY_HEADER_SIZE as u64)?;
    if got < data.len() {
        return Ok(FrameRead::Torn {
            declared: header.length,
            available: got,
        });
    }

    let actual = compute_checksum(header.entry_type, &data);
    if actual != header.checksum {
        return Ok(FrameRead::ChecksumMismatch {
            expected: header.checksum,
            actual,
        });
    }

    Ok(FrameRead::Valid {
        size: header.frame_size(),
        entry: WalEntry {
            entry_type: header.entry_type,
            data,
            checksum: header.checksum,
        },
    })
}

/// Read and validate the file header of an open log file
pub(crate) fn read_file_header(file: &File) -> Result<FileHeader> {
    let mut buf = [0u8; FILE_HEADER_SIZE];
    let got = read_full_at(file, &mut buf, 0)?;
    let header = FileHeader::decode(&buf[..got])?;
    header.validate()?;
    Ok(header)
}

/// Sequential, read-only reader over an existing log file
///
/// Never modifies the file. Stops with an error at the first unsound frame
/// instead of truncating; use [`Wal::open`](crate::Wal::open) for recovery.
pub struct WalReader {
    file: File,
    position: u64,
    next_index: u64,
    max_entry_size: u32,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path, max_entry_size: u32) -> Result<Self> {
        let file = File::open(path)?;
        read_file_header(&file)?;
        Ok(Self {
            file,
            position: FILE_HEADER_SIZE as u64,
            next_index: 1,
            max_entry_size,
        })
    }

    /// Read the next entry, paired with its log index
    ///
    /// `Ok(None)` at a clean end of file.
    pub fn next_entry(&mut self) -> Result<Option<(u64, WalEntry)>> {
        let offset = self.position;
        let (entry, size) = match read_frame_at(&self.file, offset, self.max_entry_size)? {
            FrameRead::End => return Ok(None),
            other => other.into_entry(offset)?,
        };

        let index = self.next_index;
        self.position += size;
        self.next_index += 1;
        Ok(Some((index, entry)))
    }

    /// Byte offset of the next frame to be read
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Iterate over all entries
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }
}

/// Iterator over WAL entries; fused after the first error
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<(u64, WalEntry)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
