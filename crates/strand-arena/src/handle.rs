//! Chunk handles.
//!
//! A [`ChunkHandle`] is the only token a collaborator keeps for its units.
//! It names a slot in the arena's chunk table, never a position: the
//! chunk's `begin` is looked up through the handle on every access, so
//! compaction can relocate data without invalidating handles.

use std::fmt;

use strand_core::{ArenaId, Generation};

/// Generation-checked reference to an occupied chunk.
///
/// Validated in O(1): the arena ID must match, and the slot must still be
/// occupied at the same generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkKey {
    pub(crate) arena: ArenaId,
    pub(crate) slot: u32,
    pub(crate) generation: Generation,
}

impl ChunkKey {
    pub(crate) fn new(arena: ArenaId, slot: u32, generation: Generation) -> Self {
        Self {
            arena,
            slot,
            generation,
        }
    }

    /// The arena that issued this key.
    pub fn arena(&self) -> ArenaId {
        self.arena
    }

    /// The slot generation this key was issued at.
    pub fn generation(&self) -> Generation {
        self.generation
    }
}

/// Handle to a run of units owned by a collaborator.
///
/// `Empty` is the zero-unit sentinel: every `allocate(0)` returns it, it
/// owns no storage, and releasing it is a no-op. It is a plain enum case,
/// so there is no shared placeholder chunk aliased across arenas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[must_use]
pub enum ChunkHandle {
    /// The zero-unit sentinel.
    #[default]
    Empty,
    /// A live (or formerly live) allocation.
    Live(ChunkKey),
}

impl ChunkHandle {
    /// Whether this is the zero-unit sentinel.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The key of a live allocation, or `None` for the sentinel.
    pub fn key(&self) -> Option<ChunkKey> {
        match self {
            Self::Empty => None,
            Self::Live(key) => Some(*key),
        }
    }
}

impl fmt::Display for ChunkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "ChunkHandle(empty)"),
            Self::Live(key) => write!(
                f,
                "ChunkHandle(arena={}, slot={}, gen={})",
                key.arena, key.slot, key.generation
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_handle_is_empty() {
        let h = ChunkHandle::default();
        assert!(h.is_empty());
        assert_eq!(h.key(), None);
    }

    #[test]
    fn live_handle_exposes_key() {
        let arena = ArenaId::next();
        let key = ChunkKey::new(arena, 3, Generation(7));
        let h = ChunkHandle::Live(key);
        assert!(!h.is_empty());
        assert_eq!(h.key().map(|k| k.arena()), Some(arena));
        assert_eq!(h.key().map(|k| k.generation()), Some(Generation(7)));
    }

    #[test]
    fn display_names_slot_and_generation() {
        let key = ChunkKey::new(ArenaId::next(), 2, Generation(5));
        let text = ChunkHandle::Live(key).to_string();
        assert!(text.contains("slot=2"));
        assert!(text.contains("gen=5"));
        assert_eq!(ChunkHandle::Empty.to_string(), "ChunkHandle(empty)");
    }
}
