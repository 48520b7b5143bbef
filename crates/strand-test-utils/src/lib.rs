//! Test utilities and mock stores for Strand development.
//!
//! Provides [`TaggedStore`], a [`UnitStore`] whose units are plain `u64`
//! tags so tests can see exactly where data went, plus table-invariant
//! assertions for [`ChunkArena`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use strand_arena::{ChunkArena, ChunkHandle};
use strand_core::UnitStore;

/// Mock unit store backed by a `Vec<u64>`.
///
/// Counts resize and per-unit copy calls so tests can assert whether an
/// operation moved data.
#[derive(Clone, Debug, Default)]
pub struct TaggedStore {
    tags: Vec<u64>,
    resizes: usize,
    copies: usize,
}

impl TaggedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All tags, one per unit.
    pub fn tags(&self) -> &[u64] {
        &self.tags
    }

    pub fn set_tag(&mut self, index: usize, tag: u64) {
        self.tags[index] = tag;
    }

    /// Number of `resize` calls so far.
    pub fn resize_count(&self) -> usize {
        self.resizes
    }

    /// Number of units copied so far.
    pub fn copy_count(&self) -> usize {
        self.copies
    }
}

impl UnitStore for TaggedStore {
    fn len(&self) -> usize {
        self.tags.len()
    }

    fn resize(&mut self, new_len: usize) {
        self.resizes += 1;
        self.tags.resize(new_len, 0);
    }

    fn copy_unit(&mut self, to: usize, from: usize) {
        self.copies += 1;
        self.tags[to] = self.tags[from];
    }
}

/// Write `seed * 1000 + local` into every unit of `handle`.
///
/// # Panics
///
/// Panics if the handle is not valid for `arena`.
pub fn stamp(arena: &mut ChunkArena<TaggedStore>, handle: ChunkHandle, seed: u64) {
    let units = arena.units(handle).expect("stamp: handle is not live");
    let begin = units.start;
    for index in units {
        let local = (index - begin) as u64;
        arena.store_mut().set_tag(index, seed * 1000 + local);
    }
}

/// The tags currently owned by `handle`, in local order.
///
/// # Panics
///
/// Panics if the handle is not valid for `arena`.
pub fn read_tags(arena: &ChunkArena<TaggedStore>, handle: ChunkHandle) -> Vec<u64> {
    let units = arena.units(handle).expect("read_tags: handle is not live");
    arena.store().tags()[units].to_vec()
}

/// What [`stamp`] writes for `len` units.
pub fn expected_tags(seed: u64, len: u32) -> Vec<u64> {
    (0..len as u64).map(|local| seed * 1000 + local).collect()
}

/// Assert the table invariants every public arena operation must keep:
///
/// - chunks are ordered, contiguous, and cover exactly `[0, capacity)`
/// - `occupied_units` equals the sum of occupied chunk sizes
/// - no two adjacent chunks are both free
/// - no chunk is empty
/// - the store length matches capacity
pub fn assert_arena_invariants<S: UnitStore>(arena: &ChunkArena<S>) {
    let mut cursor = 0u32;
    let mut occupied = 0u32;
    let mut prev_free = false;
    for (pos, chunk) in arena.chunks().enumerate() {
        assert!(!chunk.is_empty(), "chunk {pos} is empty");
        assert_eq!(
            chunk.begin(),
            cursor,
            "chunk {pos} ({chunk}) does not start where the previous one ended"
        );
        assert!(
            !(prev_free && chunk.is_free()),
            "chunk {pos} ({chunk}) is free and follows a free chunk"
        );
        if !chunk.is_free() {
            occupied += chunk.size();
        }
        prev_free = chunk.is_free();
        cursor += chunk.size();
    }
    assert_eq!(cursor, arena.capacity(), "table does not cover capacity");
    assert_eq!(occupied, arena.occupied_units(), "occupancy mismatch");
    assert_eq!(
        arena.store().len(),
        arena.capacity() as usize,
        "store length out of step with capacity"
    );
}

/// Table layout as `(begin, size, is_free)` triples.
pub fn layout<S: UnitStore>(arena: &ChunkArena<S>) -> Vec<(u32, u32, bool)> {
    arena
        .chunks()
        .map(|c| (c.begin(), c.size(), c.is_free()))
        .collect()
}
