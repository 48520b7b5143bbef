//! Chunk descriptors.

use std::fmt;
use std::ops::Range;

/// Read-only snapshot of a contiguous unit range `[begin, end]`.
///
/// Values are produced by the arena on request and go stale at the next
/// arena mutation. Collaborators keep the [`ChunkHandle`](crate::ChunkHandle)
/// and ask for a fresh `Chunk` when they need positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Chunk {
    begin: u32,
    size: u32,
    free: bool,
}

impl Chunk {
    /// The zero-unit chunk the sentinel handle resolves to.
    pub const EMPTY: Chunk = Chunk {
        begin: 0,
        size: 0,
        free: false,
    };

    pub(crate) fn new(begin: u32, size: u32, free: bool) -> Self {
        Self { begin, size, free }
    }

    /// First unit index.
    pub fn begin(&self) -> u32 {
        self.begin
    }

    /// Last unit index (inclusive), or `None` for the empty chunk.
    pub fn end(&self) -> Option<u32> {
        self.size.checked_sub(1).map(|last| self.begin + last)
    }

    /// Number of units, `end - begin + 1`.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Whether the chunk has no units.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Whether the range is in the free pool.
    pub fn is_free(&self) -> bool {
        self.free
    }

    /// Unit indices as a half-open range, ready for slicing store arrays.
    pub fn range(&self) -> Range<usize> {
        let begin = self.begin as usize;
        begin..begin + self.size as usize
    }

    /// Whether `index` falls inside this chunk.
    pub fn contains(&self, index: u32) -> bool {
        index >= self.begin && index - self.begin < self.size
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.free { "free" } else { "occupied" };
        match self.end() {
            Some(end) => write!(f, "[{}, {end}] {state}", self.begin),
            None => write!(f, "[] empty"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_is_inclusive() {
        let c = Chunk::new(4, 4, false);
        assert_eq!(c.begin(), 4);
        assert_eq!(c.end(), Some(7));
        assert_eq!(c.size(), 4);
        assert_eq!(c.range(), 4..8);
    }

    #[test]
    fn empty_chunk_has_no_end() {
        assert!(Chunk::EMPTY.is_empty());
        assert_eq!(Chunk::EMPTY.end(), None);
        assert_eq!(Chunk::EMPTY.range(), 0..0);
        assert!(!Chunk::EMPTY.contains(0));
    }

    #[test]
    fn contains_checks_both_bounds() {
        let c = Chunk::new(3, 2, true);
        assert!(!c.contains(2));
        assert!(c.contains(3));
        assert!(c.contains(4));
        assert!(!c.contains(5));
    }

    #[test]
    fn display_shows_range_and_state() {
        assert_eq!(Chunk::new(0, 4, false).to_string(), "[0, 3] occupied");
        assert_eq!(Chunk::new(6, 2, true).to_string(), "[6, 7] free");
        assert_eq!(Chunk::EMPTY.to_string(), "[] empty");
    }
}
