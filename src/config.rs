//! Configuration for raftwal
//!
//! Per-log limits with sensible defaults.

use crate::error::{Result, WalError};
use crate::wal::{ENTRY_HEADER_SIZE, FILE_HEADER_SIZE};

/// Default maximum payload size of a single record (10 MiB)
pub const DEFAULT_MAX_ENTRY_SIZE: u32 = 10 * 1024 * 1024;

/// Default advisory ceiling on total file size (100 MiB)
pub const DEFAULT_MAX_SEGMENT_SIZE: u64 = 100 * 1024 * 1024;

/// Configuration for a single log file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalConfig {
    // -------------------------------------------------------------------------
    // Limits
    // -------------------------------------------------------------------------
    /// Largest payload accepted by append, and the largest length field
    /// trusted while reading a frame back.
    pub max_entry_size: u32,

    /// Advisory ceiling on file growth. Crossing it is logged, never rejected.
    pub max_segment_size: u64,

    // -------------------------------------------------------------------------
    // Recovery
    // -------------------------------------------------------------------------
    /// What open does with a torn or corrupt tail
    pub recovery_mode: RecoveryMode,
}

/// Policy applied when the open-time scan hits an unsound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryMode {
    /// Truncate the file at the start of the first unsound frame and open
    /// with the valid prefix (torn-write self-healing)
    #[default]
    TruncateTail,

    /// Fail open with a corruption error and leave the file untouched
    Strict,
}

impl Default for WalConfig {
    fn default() -> Self {
        Self {
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
            max_segment_size: DEFAULT_MAX_SEGMENT_SIZE,
            recovery_mode: RecoveryMode::TruncateTail,
        }
    }
}

impl WalConfig {
    /// Create a new config builder
    pub fn builder() -> WalConfigBuilder {
        WalConfigBuilder::default()
    }

    /// Check that the limits are coherent: one maximal frame must fit in a segment.
    pub fn validate(&self) -> Result<()> {
        let largest_file = FILE_HEADER_SIZE as u64 + ENTRY_HEADER_SIZE as u64 + self.max_entry_size as u64;
        if largest_file > self.max_segment_size {
            return Err(WalError::Config(format!(
                "max_segment_size ({}) cannot hold a single entry of max_entry_size ({})",
                self.max_segment_size, self.max_entry_size
            )));
        }
        Ok(())
    }
}

/// Builder for WalConfig
#[derive(Default)]
pub struct WalConfigBuilder {
    config: WalConfig,
}

impl WalConfigBuilder {
    /// Set the maximum payload size (in bytes)
    pub fn max_entry_size(mut self, size: u32) -> Self {
        self.config.max_entry_size = size;
        self
    }

    /// Set the advisory maximum file size (in bytes)
    pub fn max_segment_size(mut self, size: u64) -> Self {
        self.config.max_segment_size = size;
        self
    }

    /// Set the recovery policy
    pub fn recovery_mode(mut self, mode: RecoveryMode) -> Self {
        self.config.recovery_mode = mode;
        self
    }

    pub fn build(self) -> WalConfig {
        self.config
    }
}
