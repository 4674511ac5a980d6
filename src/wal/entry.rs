//! WAL Entry definitions
//!
//! Byte layout of the file header and of a single record frame, plus the
//! CRC32 checksum that guards each frame.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, WalError};

// =============================================================================
// Format Constants
// =============================================================================

/// Magic number identifying a raftwal file ("WAL!")
pub const WAL_MAGIC: u32 = 0x5741_4C21;

/// Current file format version
pub const WAL_VERSION: u32 = 1;

/// File header size: Magic (4) + Version (4) = 8 bytes
pub const FILE_HEADER_SIZE: usize = 8;

/// Frame header size: Type (1) + Length (4) + CRC (4) = 9 bytes
pub const ENTRY_HEADER_SIZE: usize = 9;

// =============================================================================
// Entry Types
// =============================================================================

/// Record-kind tag stored in the first byte of every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EntryType {
    /// Caller payload
    Data = 1,
}

impl EntryType {
    /// Map a raw tag byte back to a known kind
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(EntryType::Data),
            _ => None,
        }
    }
}

// =============================================================================
// File Header
// =============================================================================

/// The 8-byte header written once at file creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub magic: u32,
    pub version: u32,
}

impl FileHeader {
    /// Header for a freshly created file
    pub fn current() -> Self {
        Self {
            magic: WAL_MAGIC,
            version: WAL_VERSION,
        }
    }

    pub fn encode(&self) -> [u8; FILE_HEADER_SIZE] {
        let mut buf = [0u8; FILE_HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic.to_be_bytes());
        buf[4..8].copy_from_slice(&self.version.to_be_bytes());
        buf
    }

    pub fn decode(mut bytes: &[u8]) -> Result<Self> {
        if bytes.len() < FILE_HEADER_SIZE {
            return Err(WalError::Corrupted(format!(
                "file header is {} bytes, expected {}",
                bytes.len(),
                FILE_HEADER_SIZE
            )));
        }
        let magic = bytes.get_u32();
        let version = bytes.get_u32();
        Ok(Self { magic, version })
    }

    /// Check magic and version against what this build understands
    pub fn validate(&self) -> Result<()> {
        if self.magic != WAL_MAGIC {
            return Err(WalError::Corrupted(format!(
                "bad magic number: expected {:#010x}, got {:#010x}",
                WAL_MAGIC, self.magic
            )));
        }
        if self.version != WAL_VERSION {
            return Err(WalError::Corrupted(format!(
                "unsupported format version: {}",
                self.version
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Record Frame
// =============================================================================

/// Decoded fixed-size prefix of a frame. The checksum is untrusted until
/// compared against [`compute_checksum`] over the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub entry_type: u8,
    pub length: u32,
    pub checksum: u32,
}

impl FrameHeader {
    pub fn decode(mut bytes: &[u8]) -> Self {
        debug_assert!(bytes.len() >= ENTRY_HEADER_SIZE);
        let entry_type = bytes.get_u8();
        let length = bytes.get_u32();
        let checksum = bytes.get_u32();
        Self {
            entry_type,
            length,
            checksum,
        }
    }

    /// Total on-disk size of the frame this header starts
    pub fn frame_size(&self) -> u64 {
        ENTRY_HEADER_SIZE as u64 + self.length as u64
    }
}

/// A single record in the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalEntry {
    /// Raw record-kind tag
    pub entry_type: u8,

    /// Caller payload
    pub data: Vec<u8>,

    /// CRC32 over type + length + data
    pub checksum: u32,
}

impl WalEntry {
    /// Build a data record with its checksum already computed
    pub fn new(data: Vec<u8>) -> Self {
        Self::with_type(EntryType::Data, data)
    }

    pub fn with_type(entry_type: EntryType, data: Vec<u8>) -> Self {
        let checksum = compute_checksum(entry_type as u8, &data);
        Self {
            entry_type: entry_type as u8,
            data,
            checksum,
        }
    }

    /// Exact number of bytes this entry occupies on disk
    pub fn frame_size(&self) -> u64 {
        ENTRY_HEADER_SIZE as u64 + self.data.len() as u64
    }

    /// Encode to `[type][len][crc][data]`
    pub fn encode(&self) -> Bytes {
        encode_frame(self.entry_type, &self.data, self.checksum)
    }

    /// Decode a complete frame held in memory, verifying the checksum.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < ENTRY_HEADER_SIZE {
            return Err(WalError::Corrupted(format!(
                "frame is {} bytes, shorter than the {}-byte header",
                bytes.len(),
                ENTRY_HEADER_SIZE
            )));
        }
        let header = FrameHeader::decode(&bytes[..ENTRY_HEADER_SIZE]);
        let body = &bytes[ENTRY_HEADER_SIZE..];
        if body.len() != header.length as usize {
            return Err(WalError::Corrupted(format!(
                "frame declares {} payload bytes but holds {}",
                header.length,
                body.len()
            )));
        }
        let actual = compute_checksum(header.entry_type, body);
        if actual != header.checksum {
            return Err(WalError::ChecksumMismatch {
                offset: 0,
                expected: header.checksum,
                actual,
            });
        }
        Ok(Self {
            entry_type: header.entry_type,
            data: body.to_vec(),
            checksum: header.checksum,
        })
    }

    /// True if the stored checksum matches the contents
    pub fn verify(&self) -> bool {
        compute_checksum(self.entry_type, &self.data) == self.checksum
    }
}

/// Encode one frame without building a [`WalEntry`] first
pub fn encode_frame(entry_type: u8, data: &[u8], checksum: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(ENTRY_HEADER_SIZE + data.len());
    buf.put_u8(entry_type);
    buf.put_u32(data.len() as u32);
    buf.put_u32(checksum);
    buf.put_slice(data);
    buf.freeze()
}

/// CRC32 (IEEE) over `[type][length as u32 BE][data]`
pub fn compute_checksum(entry_type: u8, data: &[u8]) -> u32 {
    let mut prefix = [0u8; 5];
    prefix[0] = entry_type;
    prefix[1..5].copy_from_slice(&(data.len() as u32).to_be_bytes());

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&prefix);
    hasher.update(data);
    hasher.finalize()
}
