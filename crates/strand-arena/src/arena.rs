//! The chunk arena allocator.
//!
//! [`ChunkArena`] owns an ordered chunk table partitioning `[0, capacity)`
//! and a [`UnitStore`] resized in lockstep with it. The lifecycle of an
//! allocation is:
//! 1. `allocate(n)`: first-fit over free chunks, splitting larger ones;
//!    under pressure, compact or grow first
//! 2. the owner addresses `begin + local` through [`ChunkArena::unit_index`]
//!    or [`ChunkArena::units`], re-deriving positions before each access
//! 3. `resize(handle, n)`: shrink in place, or move to a fresh chunk
//! 4. `deallocate(handle)`: return the range and coalesce with free neighbours

use std::cmp::Ordering;
use std::fmt;
use std::ops::Range;

use strand_core::{ArenaId, UnitStore};
use tracing::{debug, trace};

use crate::chunk::Chunk;
use crate::compact::{self, CompactionReport};
use crate::config::{ArenaConfig, Growth};
use crate::error::ArenaError;
use crate::handle::{ChunkHandle, ChunkKey};
use crate::stats::ArenaStats;
use crate::table::ChunkTable;

/// Fixed-unit-size arena allocator with online compaction.
///
/// Not synchronised: one owning thread serialises every call. Handles stay
/// valid across compaction (only their `begin` moves) and become stale on
/// deallocation.
///
/// # Table layout
///
/// ```text
/// capacity = 10
/// [0,3] occupied  [4,7] occupied  [8,9] free
///  ^ handle A      ^ handle B      ^ tail run, extended on growth
/// ```
pub struct ChunkArena<S: UnitStore> {
    /// Identity stamped into every handle this arena issues.
    id: ArenaId,
    /// Backing parallel arrays, always `capacity` units long.
    store: S,
    /// Chunk table partitioning `[0, capacity)`.
    table: ChunkTable,
    /// Current capacity in units.
    capacity: u32,
    /// Sum of occupied chunk sizes.
    occupied: u32,
    /// Upper bound on the largest free chunk. Recomputed before a
    /// "does not fit" decision is trusted.
    free_hint: u32,
    growth: Growth,
    ceiling: Option<u32>,
    compact_on_pressure: bool,
    grow_events: u64,
    merge_passes: u64,
    trim_passes: u64,
    units_relocated: u64,
}

impl<S: UnitStore> ChunkArena<S> {
    /// Create an arena over `store`.
    ///
    /// The table starts as one free chunk spanning `[0, initial_capacity)`
    /// (or empty for zero capacity) and the store is resized to match.
    /// Returns `Err(ArenaError::InvalidConfig)` if `config` is inconsistent.
    pub fn new(mut store: S, config: ArenaConfig) -> Result<Self, ArenaError> {
        config.validate()?;
        let capacity = config.initial_capacity;
        store.resize(capacity as usize);
        let id = ArenaId::next();
        debug!(arena = %id, capacity, growth = ?config.growth, "arena created");
        Ok(Self {
            id,
            store,
            table: ChunkTable::new(capacity),
            capacity,
            occupied: 0,
            free_hint: capacity,
            growth: config.growth,
            ceiling: config.capacity_ceiling,
            compact_on_pressure: config.compact_on_pressure,
            grow_events: 0,
            merge_passes: 0,
            trim_passes: 0,
            units_relocated: 0,
        })
    }

    /// This arena's identity.
    pub fn id(&self) -> ArenaId {
        self.id
    }

    /// Current capacity in units.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Units owned by occupied chunks.
    pub fn occupied_units(&self) -> u32 {
        self.occupied
    }

    /// Units in the free pool, possibly split across several chunks.
    pub fn free_units(&self) -> u32 {
        self.capacity - self.occupied
    }

    /// The growth policy.
    pub fn growth(&self) -> Growth {
        self.growth
    }

    /// The capacity ceiling, if any.
    pub fn capacity_ceiling(&self) -> Option<u32> {
        self.ceiling
    }

    /// Shared access to the backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the backing store, for per-unit reads and writes.
    ///
    /// Only the arena resizes the store or moves units between chunks;
    /// callers write fields inside ranges they own.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Tear the arena down, keeping the store.
    pub fn into_store(self) -> S {
        self.store
    }

    // ── Queries ──────────────────────────────────────────────

    /// Current position of a handle's chunk.
    ///
    /// The sentinel resolves to [`Chunk::EMPTY`]. Returns `None` for stale
    /// or foreign handles. Never panics.
    pub fn chunk(&self, handle: ChunkHandle) -> Option<Chunk> {
        match handle {
            ChunkHandle::Empty => Some(Chunk::EMPTY),
            ChunkHandle::Live(key) => self.resolve(key).ok().map(|slot| self.occupied_chunk(slot)),
        }
    }

    /// Whether `handle` is the sentinel or a live allocation of this arena.
    pub fn is_valid(&self, handle: ChunkHandle) -> bool {
        self.chunk(handle).is_some()
    }

    /// Absolute unit index of `local` within the handle's chunk.
    ///
    /// Returns `None` for invalid handles or `local >= size`. The result
    /// is only meaningful until the next arena mutation.
    pub fn unit_index(&self, handle: ChunkHandle, local: u32) -> Option<usize> {
        self.chunk(handle)
            .filter(|c| local < c.size())
            .map(|c| (c.begin() + local) as usize)
    }

    /// Absolute unit indices of the handle's chunk, for slicing store arrays.
    pub fn units(&self, handle: ChunkHandle) -> Option<Range<usize>> {
        self.chunk(handle).map(|c| c.range())
    }

    /// Iterate the chunk table in ascending `begin` order.
    pub fn chunks(&self) -> impl Iterator<Item = Chunk> + '_ {
        self.table
            .iter()
            .map(|s| Chunk::new(s.begin, s.len, s.free))
    }

    /// Occupancy snapshot and cumulative counters.
    pub fn stats(&self) -> ArenaStats {
        let mut stats = ArenaStats {
            capacity: self.capacity,
            occupied_units: self.occupied,
            free_units: self.free_units(),
            grow_events: self.grow_events,
            merge_passes: self.merge_passes,
            trim_passes: self.trim_passes,
            units_relocated: self.units_relocated,
            ..ArenaStats::default()
        };
        for slot in self.table.iter() {
            stats.chunk_count += 1;
            if slot.free {
                stats.free_chunk_count += 1;
                stats.biggest_free_run = stats.biggest_free_run.max(slot.len);
            }
        }
        stats
    }

    // ── Allocation ───────────────────────────────────────────

    /// Allocate `size` contiguous units.
    ///
    /// `size == 0` returns [`ChunkHandle::Empty`]. Otherwise the first free
    /// chunk (in ascending address order) that fits is used, splitting off
    /// any excess as a new free chunk. If nothing fits:
    /// - with enough aggregate free space and `compact_on_pressure`, the
    ///   arena is compacted (moving data) and the request retried;
    /// - otherwise, if growth is enabled, capacity grows by
    ///   `size + increment` (clamped to the ceiling) and the request is
    ///   retried once.
    ///
    /// Returns `Err(ArenaError::CapacityExhausted)` when none of that
    /// works; the failure path never moves data.
    pub fn allocate(&mut self, size: u32) -> Result<ChunkHandle, ArenaError> {
        if size == 0 {
            return Ok(ChunkHandle::Empty);
        }
        if let Some(handle) = self.try_place(size) {
            self.debug_check();
            return Ok(handle);
        }

        if self.compact_on_pressure && self.free_units() >= size {
            self.compact();
            if let Some(handle) = self.try_place(size) {
                self.debug_check();
                return Ok(handle);
            }
        }

        let Growth::Increment(increment) = self.growth else {
            debug!(arena = %self.id, size, capacity = self.capacity, "allocation failed, growth disabled");
            return Err(self.exhausted(size));
        };
        let Some(target) = self.growth_target(size, increment) else {
            debug!(arena = %self.id, size, capacity = self.capacity, ceiling = ?self.ceiling, "allocation failed, ceiling reached");
            return Err(self.exhausted(size));
        };
        self.grow_to(target).map_err(|_| self.exhausted(size))?;
        let handle = self.try_place(size).ok_or_else(|| self.exhausted(size))?;
        self.debug_check();
        Ok(handle)
    }

    /// Return a chunk to the free pool.
    ///
    /// No-op for the sentinel. The chunk is coalesced with free neighbours
    /// without moving data, and `handle` (plus every copy of it) becomes
    /// stale. Releasing a stale or foreign handle panics in debug builds
    /// and is ignored in release builds.
    pub fn deallocate(&mut self, handle: ChunkHandle) {
        let ChunkHandle::Live(key) = handle else {
            return;
        };
        let Ok(slot) = self.checked(key) else {
            return;
        };
        let len = self.table.slot(slot).len;
        let pos = self.table.position_of(slot);
        self.table.release(slot);
        self.occupied -= len;
        let pos = compact::coalesce_at(&mut self.table, pos);
        self.free_hint = self.free_hint.max(self.table.slot_at(pos).len);
        trace!(arena = %self.id, slot, len, "chunk released");
        self.debug_check();
    }

    /// Change the size of an allocation.
    ///
    /// - `new_size == 0` deallocates and returns the sentinel.
    /// - The sentinel with `new_size > 0` allocates.
    /// - Shrinking happens in place: the tail is returned to the free pool
    ///   and the same handle comes back.
    /// - Growing allocates a fresh chunk, copies the old units across,
    ///   releases the old chunk and returns the new handle.
    ///
    /// On failure the original handle is untouched and still valid.
    pub fn resize(&mut self, handle: ChunkHandle, new_size: u32) -> Result<ChunkHandle, ArenaError> {
        let ChunkHandle::Live(key) = handle else {
            return self.allocate(new_size);
        };
        let slot = self.checked(key)?;
        let old_size = self.table.slot(slot).len;

        match new_size.cmp(&old_size) {
            Ordering::Equal => Ok(handle),
            Ordering::Less if new_size == 0 => {
                self.deallocate(handle);
                Ok(ChunkHandle::Empty)
            }
            Ordering::Less => {
                self.shrink_in_place(slot, new_size);
                self.debug_check();
                Ok(handle)
            }
            Ordering::Greater => {
                let fresh = self.allocate(new_size)?;
                // Allocation may have compacted, so both positions are re-read.
                let src = self.table.slot(slot).begin;
                let dst = self.chunk(fresh).map_or(0, |c| c.begin());
                self.store
                    .copy(dst as usize, old_size as usize, src as usize);
                self.deallocate(handle);
                Ok(fresh)
            }
        }
    }

    /// Copy `min(dst.size, src.size)` units from `src` to `dst`.
    pub fn copy(&mut self, dst: ChunkHandle, src: ChunkHandle) -> Result<(), ArenaError> {
        let to = self.checked_chunk(dst)?;
        let from = self.checked_chunk(src)?;
        let count = to.size().min(from.size());
        if count > 0 && to.begin() != from.begin() {
            self.store
                .copy(to.begin() as usize, count as usize, from.begin() as usize);
        }
        Ok(())
    }

    // ── Capacity ─────────────────────────────────────────────

    /// Change the arena's capacity.
    ///
    /// Growing extends the trailing free chunk (or appends one) and fails
    /// with `CapacityExhausted` above the ceiling. Shrinking fails with
    /// `InvalidShrink` if the occupied units cannot fit; otherwise it drops
    /// trailing free space, compacting first if free space is scattered.
    /// Failures leave capacity and table unchanged.
    pub fn resize_capacity(&mut self, new_capacity: u32) -> Result<(), ArenaError> {
        let result = match new_capacity.cmp(&self.capacity) {
            Ordering::Equal => Ok(()),
            Ordering::Greater => self.grow_to(new_capacity),
            Ordering::Less => self.shrink_to(new_capacity),
        };
        self.debug_check();
        result
    }

    // ── Compaction ───────────────────────────────────────────

    /// Merge-only pass: coalesce adjacent free chunks without moving data.
    ///
    /// Returns the number of chunks absorbed. Also refreshes the exact
    /// biggest-free-run.
    pub fn merge_free_runs(&mut self) -> usize {
        let merged = self.merge_pass();
        self.free_hint = self.exact_biggest_free();
        merged
    }

    /// Merge-and-trim pass: move every occupied chunk down so that all free
    /// space forms one trailing run.
    ///
    /// Handles stay valid; positions read before this call are stale.
    pub fn compact(&mut self) -> CompactionReport {
        let report = compact::trim(&mut self.table, &mut self.store, self.capacity);
        self.trim_passes += 1;
        self.units_relocated += report.units_moved();
        self.free_hint = self.free_units();
        debug!(
            arena = %self.id,
            chunks_moved = report.chunks_moved(),
            units_moved = report.units_moved(),
            "arena compacted"
        );
        self.debug_check();
        report
    }

    // ── Internals ────────────────────────────────────────────

    /// Validate a key without side effects.
    fn resolve(&self, key: ChunkKey) -> Result<u32, ArenaError> {
        if key.arena != self.id {
            return Err(ArenaError::HandleMisuse {
                reason: format!("handle from arena {} used with arena {}", key.arena, self.id),
            });
        }
        match self.table.get(key.slot) {
            Some(s) if s.in_table && !s.free && s.generation == key.generation => Ok(key.slot),
            _ => Err(ArenaError::HandleMisuse {
                reason: format!(
                    "stale handle: slot {} generation {} is no longer allocated",
                    key.slot, key.generation
                ),
            }),
        }
    }

    /// Validate a key passed to a mutating operation.
    ///
    /// Misuse is a programmer error: debug builds panic here.
    fn checked(&self, key: ChunkKey) -> Result<u32, ArenaError> {
        let result = self.resolve(key);
        if cfg!(debug_assertions) {
            if let Err(err) = &result {
                panic!("{err}");
            }
        }
        result
    }

    fn checked_chunk(&self, handle: ChunkHandle) -> Result<Chunk, ArenaError> {
        match handle {
            ChunkHandle::Empty => Ok(Chunk::EMPTY),
            ChunkHandle::Live(key) => self.checked(key).map(|slot| self.occupied_chunk(slot)),
        }
    }

    fn occupied_chunk(&self, slot: u32) -> Chunk {
        let s = self.table.slot(slot);
        Chunk::new(s.begin, s.len, false)
    }

    fn exhausted(&self, size: u32) -> ArenaError {
        ArenaError::CapacityExhausted {
            requested: size,
            capacity: self.capacity,
            ceiling: self.ceiling,
        }
    }

    fn exact_biggest_free(&self) -> u32 {
        self.table
            .iter()
            .filter(|s| s.free)
            .map(|s| s.len)
            .max()
            .unwrap_or(0)
    }

    fn merge_pass(&mut self) -> usize {
        self.merge_passes += 1;
        compact::merge_free_runs(&mut self.table)
    }

    /// First-fit placement without growth or data movement.
    fn try_place(&mut self, size: u32) -> Option<ChunkHandle> {
        if size > self.free_hint {
            if self.free_units() < size {
                return None;
            }
            self.merge_pass();
            self.free_hint = self.exact_biggest_free();
            if size > self.free_hint {
                return None;
            }
        }

        let mut biggest = 0;
        for pos in 0..self.table.len() {
            let chunk = self.table.slot_at(pos);
            if !chunk.free {
                continue;
            }
            if chunk.len >= size {
                return Some(self.place(pos, size));
            }
            biggest = biggest.max(chunk.len);
        }
        // A full scan found nothing, so the hint is now exact.
        self.free_hint = biggest;
        None
    }

    /// Occupy the head of the free chunk at `pos`, splitting off the rest.
    fn place(&mut self, pos: usize, size: u32) -> ChunkHandle {
        let slot = self.table.at(pos);
        let (begin, len) = {
            let s = self.table.slot(slot);
            (s.begin, s.len)
        };
        {
            let s = self.table.slot_mut(slot);
            s.free = false;
            s.len = size;
        }
        if len > size {
            self.table.insert(pos + 1, begin + size, len - size, true);
        }
        self.occupied += size;
        trace!(arena = %self.id, slot, begin, size, "chunk allocated");
        ChunkHandle::Live(ChunkKey::new(self.id, slot, self.table.slot(slot).generation))
    }

    fn shrink_in_place(&mut self, slot: u32, new_size: u32) {
        let pos = self.table.position_of(slot);
        let (begin, len) = {
            let s = self.table.slot(slot);
            (s.begin, s.len)
        };
        self.table.slot_mut(slot).len = new_size;
        self.table
            .insert(pos + 1, begin + new_size, len - new_size, true);
        self.occupied -= len - new_size;
        let tail = compact::coalesce_at(&mut self.table, pos + 1);
        self.free_hint = self.free_hint.max(self.table.slot_at(tail).len);
    }

    /// Capacity to grow to for a `size`-unit request, or `None` if the
    /// ceiling leaves no room for it.
    fn growth_target(&self, size: u32, increment: u32) -> Option<u32> {
        let wanted = self.capacity.saturating_add(size).saturating_add(increment);
        let target = self.ceiling.map_or(wanted, |ceiling| wanted.min(ceiling));
        let trailing_free = match self.table.last() {
            Some(last) if self.table.slot(last).free => self.table.slot(last).len,
            _ => 0,
        };
        let fits = target > self.capacity && trailing_free + (target - self.capacity) >= size;
        fits.then_some(target)
    }

    fn grow_to(&mut self, new_capacity: u32) -> Result<(), ArenaError> {
        if let Some(ceiling) = self.ceiling {
            if new_capacity > ceiling {
                return Err(ArenaError::CapacityExhausted {
                    requested: new_capacity,
                    capacity: self.capacity,
                    ceiling: Some(ceiling),
                });
            }
        }
        let added = new_capacity - self.capacity;
        let tail = match self.table.last() {
            Some(last) if self.table.slot(last).free => {
                let s = self.table.slot_mut(last);
                s.len += added;
                s.len
            }
            _ => {
                self.table.push(self.capacity, added, true);
                added
            }
        };
        self.store.resize(new_capacity as usize);
        debug!(arena = %self.id, from = self.capacity, to = new_capacity, "arena grown");
        self.capacity = new_capacity;
        self.free_hint = self.free_hint.max(tail);
        self.grow_events += 1;
        Ok(())
    }

    fn shrink_to(&mut self, new_capacity: u32) -> Result<(), ArenaError> {
        let invalid = ArenaError::InvalidShrink {
            requested: new_capacity,
            occupied: self.occupied,
        };
        if self.occupied > new_capacity {
            return Err(invalid);
        }
        if !self.trim_tail(new_capacity) {
            self.compact();
            if !self.trim_tail(new_capacity) {
                return Err(invalid);
            }
        }
        self.store.resize(new_capacity as usize);
        debug!(arena = %self.id, from = self.capacity, to = new_capacity, "arena shrunk");
        self.capacity = new_capacity;
        self.free_hint = self.exact_biggest_free();
        Ok(())
    }

    /// Drop or truncate the trailing free chunk so the table ends at
    /// `new_capacity`. Returns `false` if occupied data lies past it.
    fn trim_tail(&mut self, new_capacity: u32) -> bool {
        let Some(last) = self.table.last() else {
            return new_capacity == 0;
        };
        let (free, begin) = {
            let s = self.table.slot(last);
            (s.free, s.begin)
        };
        if !free || begin > new_capacity {
            return false;
        }
        if begin == new_capacity {
            let pos = self.table.len() - 1;
            self.table.retire(pos);
        } else {
            self.table.slot_mut(last).len = new_capacity - begin;
        }
        true
    }

    /// Check every table invariant, describing the first violation.
    fn check_invariants(&self) -> Result<(), String> {
        let mut cursor = 0u32;
        let mut occupied = 0u32;
        let mut prev_free = false;
        let mut biggest = 0u32;
        for (pos, s) in self.table.iter().enumerate() {
            if s.len == 0 {
                return Err(format!("chunk {pos} is empty"));
            }
            if s.begin != cursor {
                return Err(format!("chunk {pos} begins at {}, expected {cursor}", s.begin));
            }
            if prev_free && s.free {
                return Err(format!("chunks {} and {pos} are both free", pos - 1));
            }
            if s.free {
                biggest = biggest.max(s.len);
            } else {
                occupied += s.len;
            }
            prev_free = s.free;
            cursor = s.end();
        }
        if cursor != self.capacity {
            return Err(format!("table ends at {cursor}, capacity is {}", self.capacity));
        }
        if occupied != self.occupied {
            return Err(format!("occupied {occupied} != cached {}", self.occupied));
        }
        if biggest > self.free_hint {
            return Err(format!("free hint {} below biggest free run {biggest}", self.free_hint));
        }
        if self.store.len() != self.capacity as usize {
            return Err(format!("store length {} != capacity {}", self.store.len(), self.capacity));
        }
        Ok(())
    }

    fn debug_check(&self) {
        if cfg!(debug_assertions) {
            if let Err(violation) = self.check_invariants() {
                panic!("arena {} invariant violated: {violation}", self.id);
            }
        }
    }
}

impl<S: UnitStore> fmt::Debug for ChunkArena<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkArena")
            .field("id", &self.id)
            .field("capacity", &self.capacity)
            .field("occupied", &self.occupied)
            .field("chunks", &self.table.len())
            .field("growth", &self.growth)
            .field("ceiling", &self.ceiling)
            .finish_non_exhaustive()
    }
}
