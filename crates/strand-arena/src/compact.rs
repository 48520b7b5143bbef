//! Merge-only and merge-and-trim compaction passes.
//!
//! Both passes operate on the chunk table directly; the arena wraps them
//! with occupancy bookkeeping, counters and logging.

use smallvec::SmallVec;
use strand_core::UnitStore;

use crate::table::ChunkTable;

/// One occupied run moved by a merge-and-trim pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Relocation {
    /// Old first unit index.
    pub from: u32,
    /// New first unit index. Always `<= from`.
    pub to: u32,
    /// Number of units moved.
    pub len: u32,
}

/// Outcome of a merge-and-trim pass.
///
/// Drivers that mirror the store on a device can use the relocation list
/// to re-upload only the ranges that moved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompactionReport {
    /// Occupied runs that moved, in ascending order of their new position.
    pub relocations: SmallVec<[Relocation; 8]>,
}

impl CompactionReport {
    /// Number of chunks whose data moved.
    pub fn chunks_moved(&self) -> usize {
        self.relocations.len()
    }

    /// Total units copied.
    pub fn units_moved(&self) -> u64 {
        self.relocations.iter().map(|r| r.len as u64).sum()
    }

    /// Whether the pass left every chunk in place.
    pub fn is_noop(&self) -> bool {
        self.relocations.is_empty()
    }
}

/// Coalesce every run of adjacent free chunks into one chunk.
///
/// Single left-to-right scan, no data movement. Returns the number of
/// chunks absorbed.
pub(crate) fn merge_free_runs(table: &mut ChunkTable) -> usize {
    let mut merged = 0;
    let mut pos = 0;
    while pos + 1 < table.len() {
        let here = table.slot_at(pos);
        let next = table.slot_at(pos + 1);
        if here.free && next.free {
            let extra = next.len;
            let slot = table.at(pos);
            table.slot_mut(slot).len += extra;
            table.retire(pos + 1);
            merged += 1;
        } else {
            pos += 1;
        }
    }
    merged
}

/// Coalesce the free chunk at `pos` with free neighbours on either side.
///
/// Returns the table position of the surviving chunk.
pub(crate) fn coalesce_at(table: &mut ChunkTable, mut pos: usize) -> usize {
    debug_assert!(table.slot_at(pos).free, "coalescing an occupied chunk");
    if pos + 1 < table.len() && table.slot_at(pos + 1).free {
        let extra = table.slot_at(pos + 1).len;
        let slot = table.at(pos);
        table.slot_mut(slot).len += extra;
        table.retire(pos + 1);
    }
    if pos > 0 && table.slot_at(pos - 1).free {
        let extra = table.slot_at(pos).len;
        let prev = table.at(pos - 1);
        table.slot_mut(prev).len += extra;
        table.retire(pos);
        pos -= 1;
    }
    pos
}

/// Slide every occupied chunk down to the lowest free position.
///
/// Walks the table in order keeping a write cursor: free chunks are
/// dropped, occupied chunks are copied backward to the cursor. Every copy
/// has `to <= from`, which the store contract allows even when the source
/// and destination overlap. Afterwards the table holds the occupied
/// chunks back to back followed by at most one free chunk ending at
/// `capacity`. Occupied slots keep their index and generation.
pub(crate) fn trim<S: UnitStore>(
    table: &mut ChunkTable,
    store: &mut S,
    capacity: u32,
) -> CompactionReport {
    let mut report = CompactionReport::default();
    let mut cursor = 0u32;
    let mut pos = 0;
    while pos < table.len() {
        let slot = table.at(pos);
        let chunk = table.slot(slot);
        if chunk.free {
            table.retire(pos);
            continue;
        }
        let (begin, len) = (chunk.begin, chunk.len);
        if begin != cursor {
            store.copy(cursor as usize, len as usize, begin as usize);
            table.slot_mut(slot).begin = cursor;
            report.relocations.push(Relocation {
                from: begin,
                to: cursor,
                len,
            });
        }
        cursor += len;
        pos += 1;
    }
    if cursor < capacity {
        table.push(cursor, capacity - cursor, true);
    }
    report
}
