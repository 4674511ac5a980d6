//! Error types for raftwal
//!
//! Provides a unified error type for all log operations.

use thiserror::Error;

/// Result type alias using WalError
pub type Result<T> = std::result::Result<T, WalError>;

/// Unified error type for raftwal operations
#[derive(Debug, Error)]
pub enum WalError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Corruption Errors
    // -------------------------------------------------------------------------
    #[error("WAL file is corrupted: {0}")]
    Corrupted(String),

    #[error("checksum mismatch at offset {offset}: stored {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch {
        offset: u64,
        expected: u32,
        actual: u32,
    },

    // -------------------------------------------------------------------------
    // Capacity Errors
    // -------------------------------------------------------------------------
    #[error("entry of {size} bytes exceeds maximum size of {max} bytes")]
    EntryTooLarge { size: usize, max: u32 },

    // -------------------------------------------------------------------------
    // Usage Errors
    // -------------------------------------------------------------------------
    #[error("index {index} out of range (last index: {last_index})")]
    IndexOutOfRange { index: u64, last_index: u64 },

    #[error("invalid truncate index: {index} (current log size: {len})")]
    InvalidTruncateIndex { index: u64, len: u64 },

    #[error("WAL is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl WalError {
    /// True for errors that mean the bytes on disk cannot be trusted
    pub fn is_corruption(&self) -> bool {
        matches!(self, WalError::Corrupted(_) | WalError::ChecksumMismatch { .. })
    }
}
