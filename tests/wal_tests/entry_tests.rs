//! Tests for WAL frame encoding and decoding
//!
//! These tests verify:
//! - Exact byte layout of the file header and record frames
//! - CRC32 coverage of type, length and payload
//! - Corruption detection on decode
//! - Edge cases (empty payload, short buffers, unknown types)

use raftwal::wal::{
    compute_checksum, encode_frame, EntryType, FileHeader, FrameHeader, WalEntry,
    ENTRY_HEADER_SIZE, FILE_HEADER_SIZE, WAL_MAGIC, WAL_VERSION,
};
use raftwal::WalError;

// =============================================================================
// Layout Tests
// =============================================================================

#[test]
fn test_frame_layout() {
    let entry = WalEntry::new(b"hello".to_vec());
    let bytes = entry.encode();

    assert_eq!(bytes.len(), ENTRY_HEADER_SIZE + 5);
    assert_eq!(bytes[0], EntryType::Data as u8);
    assert_eq!(&bytes[1..5], &5u32.to_be_bytes());
    assert_eq!(&bytes[5..9], &entry.checksum.to_be_bytes());
    assert_eq!(&bytes[9..], b"hello");
}

#[test]
fn test_frame_size_matches_encoding() {
    for len in [0usize, 1, 9, 100, 4096] {
        let entry = WalEntry::new(vec![7u8; len]);
        assert_eq!(entry.frame_size(), entry.encode().len() as u64);
        assert_eq!(entry.frame_size(), 9 + len as u64);
    }
}

#[test]
fn test_file_header_layout() {
    let bytes = FileHeader::current().encode();

    assert_eq!(bytes.len(), FILE_HEADER_SIZE);
    assert_eq!(&bytes[0..4], &WAL_MAGIC.to_be_bytes());
    assert_eq!(&bytes[4..8], &WAL_VERSION.to_be_bytes());
    assert_eq!(&bytes[0..4], b"WAL!");
}

#[test]
fn test_file_header_decode() {
    let header = FileHeader::decode(&FileHeader::current().encode()).unwrap();
    assert_eq!(header, FileHeader::current());
    assert!(header.validate().is_ok());
}

#[test]
fn test_file_header_bad_magic() {
    let header = FileHeader {
        magic: 0xDEAD_BEEF,
        version: WAL_VERSION,
    };
    let decoded = FileHeader::decode(&header.encode()).unwrap();
    assert!(matches!(decoded.validate(), Err(WalError::Corrupted(_))));
}

#[test]
fn test_file_header_unknown_version() {
    let header = FileHeader {
        magic: WAL_MAGIC,
        version: WAL_VERSION + 1,
    };
    assert!(matches!(header.validate(), Err(WalError::Corrupted(_))));
}

#[test]
fn test_file_header_too_short() {
    let result = FileHeader::decode(&[0x57, 0x41, 0x4C]);
    assert!(matches!(result, Err(WalError::Corrupted(_))));
}

#[test]
fn test_frame_header_decode() {
    let bytes = encode_frame(1, b"abc", 0x0102_0304);
    let header = FrameHeader::decode(&bytes);

    assert_eq!(header.entry_type, 1);
    assert_eq!(header.length, 3);
    assert_eq!(header.checksum, 0x0102_0304);
    assert_eq!(header.frame_size(), 12);
}

// =============================================================================
// Checksum Tests
// =============================================================================

#[test]
fn test_checksum_covers_type_length_and_data() {
    let mut expected = crc32fast::Hasher::new();
    expected.update(&[1]);
    expected.update(&3u32.to_be_bytes());
    expected.update(b"abc");

    assert_eq!(compute_checksum(1, b"abc"), expected.finalize());
}

#[test]
fn test_checksum_depends_on_type() {
    assert_ne!(compute_checksum(1, b"payload"), compute_checksum(2, b"payload"));
}

#[test]
fn test_checksum_of_empty_payload_is_not_zero() {
    // The type and length prefix are always hashed
    assert_ne!(compute_checksum(1, b""), 0);
}

#[test]
fn test_new_entry_verifies() {
    let entry = WalEntry::new(b"data".to_vec());
    assert!(entry.verify());

    let mut tampered = entry.clone();
    tampered.data[0] ^= 0xFF;
    assert!(!tampered.verify());
}

// =============================================================================
// Decode Tests
// =============================================================================

#[test]
fn test_decode_round_trip() {
    let entry = WalEntry::new(b"set x = 1".to_vec());
    let decoded = WalEntry::decode(&entry.encode()).unwrap();
    assert_eq!(decoded, entry);
}

#[test]
fn test_decode_empty_payload() {
    let entry = WalEntry::new(Vec::new());
    let decoded = WalEntry::decode(&entry.encode()).unwrap();
    assert!(decoded.data.is_empty());
    assert_eq!(decoded.entry_type, EntryType::Data as u8);
}

#[test]
fn test_decode_detects_flipped_payload_byte() {
    let mut bytes = WalEntry::new(b"important".to_vec()).encode().to_vec();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;

    let result = WalEntry::decode(&bytes);
    assert!(matches!(result, Err(WalError::ChecksumMismatch { .. })));
}

#[test]
fn test_decode_detects_flipped_type_byte() {
    let mut bytes = WalEntry::new(b"important".to_vec()).encode().to_vec();
    bytes[0] = 9;

    let result = WalEntry::decode(&bytes);
    assert!(matches!(result, Err(WalError::ChecksumMismatch { .. })));
}

#[test]
fn test_decode_short_buffer() {
    let bytes = WalEntry::new(b"abc".to_vec()).encode();
    let result = WalEntry::decode(&bytes[..5]);
    assert!(matches!(result, Err(WalError::Corrupted(_))));
}

#[test]
fn test_decode_length_mismatch() {
    let bytes = WalEntry::new(b"abcdef".to_vec()).encode();
    let result = WalEntry::decode(&bytes[..bytes.len() - 2]);
    assert!(matches!(result, Err(WalError::Corrupted(_))));
}

#[test]
fn test_entry_type_from_u8() {
    assert_eq!(EntryType::from_u8(1), Some(EntryType::Data));
    assert_eq!(EntryType::from_u8(0), None);
    assert_eq!(EntryType::from_u8(255), None);
}
