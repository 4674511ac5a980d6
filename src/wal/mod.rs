//! Write-Ahead Log (WAL) Module
//!
//! On-disk format, frame reading and startup recovery for the log engine.
//!
//! ## Responsibilities
//! - Frame encoding with CRC32 checksums for corruption detection
//! - Bounded two-step frame reads (header, then length-checked payload)
//! - Dense position index mapping log indices to frame offsets
//! - Crash recovery: replay valid frames, cut off a torn tail
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ File Header (8 bytes)                   │
//! │ ┌───────────────┬───────────────┐       │
//! │ │ Magic (4, BE) │ Version (4,BE)│       │
//! │ └───────────────┴───────────────┘       │
//! ├─────────────────────────────────────────┤
//! │ Entry 1                                 │
//! │ ┌─────────┬─────────┬─────────┬──────┐  │
//! │ │Type (1) │ Len (4) │ CRC (4) │ Data │  │
//! │ └─────────┴─────────┴─────────┴──────┘  │
//! ├─────────────────────────────────────────┤
//! │ Entry 2 ...                             │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Integers are big-endian. The CRC covers `[Type][Len][Data]`.

mod entry;
mod index;
pub(crate) mod io;
mod reader;
mod recovery;

pub use entry::{
    compute_checksum, encode_frame, EntryType, FileHeader, FrameHeader, WalEntry,
    ENTRY_HEADER_SIZE, FILE_HEADER_SIZE, WAL_MAGIC, WAL_VERSION,
};
pub use index::{EntryIndex, IndexEntry};
pub use reader::{WalIterator, WalReader};
pub use recovery::{RecoveryResult, WalRecovery};

pub(crate) use reader::{read_frame_at, FrameRead};
pub(crate) use recovery::Recovered;
