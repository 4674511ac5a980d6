//! Position index
//!
//! Log indices are dense and 1-based, so the index is just the frame start
//! offsets in log order: position `i` holds the offset of log index `i + 1`.

/// One index entry: a log index and the offset of its frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub index: u64,
    pub offset: u64,
}

/// Ordered frame offsets, append-only except for suffix truncation
#[derive(Debug, Default, Clone)]
pub struct EntryIndex {
    offsets: Vec<u64>,
}

impl EntryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the next frame; returns the log index it was assigned
    pub fn push(&mut self, offset: u64) -> u64 {
        debug_assert!(self.offsets.last().map_or(true, |&last| last < offset));
        self.offsets.push(offset);
        self.offsets.len() as u64
    }

    /// Number of indexed entries (equals the last log index)
    pub fn len(&self) -> u64 {
        self.offsets.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Highest log index, or 0 when empty
    pub fn last_index(&self) -> u64 {
        self.len()
    }

    /// Frame offset of a 1-based log index
    pub fn offset_of(&self, index: u64) -> Option<u64> {
        if index == 0 {
            return None;
        }
        self.offsets.get((index - 1) as usize).copied()
    }

    /// Drop `index` and everything after it; returns the dropped entry's
    /// offset, which is where the next frame must be written.
    pub fn truncate_from(&mut self, index: u64) -> Option<u64> {
        let offset = self.offset_of(index)?;
        self.offsets.truncate((index - 1) as usize);
        Some(offset)
    }

    /// Copy of every entry, in log order
    pub fn snapshot(&self) -> Vec<IndexEntry> {
        self.iter().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = IndexEntry> + '_ {
        self.offsets
            .iter()
            .enumerate()
            .map(|(i, &offset)| IndexEntry {
                index: i as u64 + 1,
                offset,
            })
    }
}
