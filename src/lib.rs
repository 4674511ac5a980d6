//! # raftwal
//!
//! A durable, crash-consistent append-only log in a single file:
//! - CRC32-checksummed, length-prefixed record frames
//! - Crash recovery that cuts off torn or corrupt tails
//! - Explicit durability control (buffered append vs. fsynced append)
//! - Truncate-from-index for Raft-style log conflict resolution
//! - Safe for concurrent use from many threads
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Wal (engine)                         │
//! │  append / sync / append_and_sync / get_entry / read_all     │
//! │  last_index / truncate_from_index / close                   │
//! └──────┬──────────────────────┬───────────────────────┬───────┘
//!        │                      │                       │
//!        ▼                      ▼                       ▼
//! ┌─────────────┐       ┌──────────────┐        ┌─────────────┐
//! │  Recovery   │       │  EntryIndex  │        │   Metrics   │
//! │ (on open)   │       │  (RwLock)    │        │  (atomics)  │
//! └──────┬──────┘       └──────────────┘        └─────────────┘
//!        │
//!        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │           Frame codec + bounded two-step reader             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use raftwal::Wal;
//!
//! # fn main() -> raftwal::Result<()> {
//! let wal = Wal::open("/tmp/raft/log.wal")?;
//! let index = wal.append_and_sync(b"term=1 set x=1")?;
//! assert_eq!(wal.get_entry(index)?, b"term=1 set x=1");
//! wal.close()?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod metrics;

pub mod wal;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{WalError, Result};
pub use config::{RecoveryMode, WalConfig};
pub use engine::Wal;
pub use metrics::MetricsSnapshot;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of raftwal
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
