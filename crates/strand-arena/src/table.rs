//! Ordered chunk table backed by a recycling slot slab.
//!
//! Slots hold chunk records and never move, so a [`ChunkKey`](crate::ChunkKey)
//! can name a slot index for the lifetime of its allocation. A separate
//! `order` vector lists slot indices sorted by `begin`; splits, merges and
//! compaction edit `order` and the slot records, but never renumber slots.

use strand_core::Generation;

/// A single chunk record.
#[derive(Clone, Debug)]
pub(crate) struct ChunkSlot {
    /// First unit index.
    pub begin: u32,
    /// Number of units. Never zero while the slot is in `order`.
    pub len: u32,
    /// Whether the range is in the free pool.
    pub free: bool,
    /// Reuse counter, see [`Generation`].
    pub generation: Generation,
    /// Whether the slot is currently referenced from `order`.
    pub in_table: bool,
}

impl ChunkSlot {
    /// One past the last unit index.
    pub fn end(&self) -> u32 {
        self.begin + self.len
    }
}

/// The arena's chunk table.
pub(crate) struct ChunkTable {
    /// All slots ever created (in use and retired).
    slots: Vec<ChunkSlot>,
    /// Indices of retired slots available for reuse.
    free_slots: Vec<u32>,
    /// Slot indices in ascending `begin` order.
    order: Vec<u32>,
}

impl ChunkTable {
    /// Create a table with a single free chunk covering `[0, capacity)`,
    /// or an empty table when `capacity` is zero.
    pub fn new(capacity: u32) -> Self {
        let mut table = Self {
            slots: Vec::new(),
            free_slots: Vec::new(),
            order: Vec::new(),
        };
        if capacity > 0 {
            table.insert(0, 0, capacity, true);
        }
        table
    }

    /// Number of chunks in the table.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Slot index at table position `pos`.
    pub fn at(&self, pos: usize) -> u32 {
        self.order[pos]
    }

    /// Slot record by index, or `None` if the index was never issued.
    pub fn get(&self, slot: u32) -> Option<&ChunkSlot> {
        self.slots.get(slot as usize)
    }

    pub fn slot(&self, slot: u32) -> &ChunkSlot {
        &self.slots[slot as usize]
    }

    pub fn slot_mut(&mut self, slot: u32) -> &mut ChunkSlot {
        &mut self.slots[slot as usize]
    }

    /// Slot record at table position `pos`.
    pub fn slot_at(&self, pos: usize) -> &ChunkSlot {
        self.slot(self.order[pos])
    }

    /// Last chunk in the table.
    pub fn last(&self) -> Option<u32> {
        self.order.last().copied()
    }

    /// Table position of an in-table slot.
    ///
    /// `order` is sorted by `begin` and no chunk is empty, so begins are
    /// unique and a binary search finds the slot.
    pub fn position_of(&self, slot: u32) -> usize {
        debug_assert!(self.slot(slot).in_table, "slot {slot} is retired");
        let begin = self.slot(slot).begin;
        self.order
            .binary_search_by_key(&begin, |&s| self.slots[s as usize].begin)
            .expect("in-table slots are listed in begin order")
    }

    /// Insert a chunk at table position `pos`, reusing a retired slot
    /// when one is available. Returns the slot index.
    pub fn insert(&mut self, pos: usize, begin: u32, len: u32, free: bool) -> u32 {
        debug_assert!(len > 0, "zero-length chunk at {begin}");
        let slot = match self.free_slots.pop() {
            Some(reuse) => {
                let s = &mut self.slots[reuse as usize];
                s.begin = begin;
                s.len = len;
                s.free = free;
                s.in_table = true;
                reuse
            }
            None => {
                let idx = self.slots.len() as u32;
                self.slots.push(ChunkSlot {
                    begin,
                    len,
                    free,
                    generation: Generation::default(),
                    in_table: true,
                });
                idx
            }
        };
        self.order.insert(pos, slot);
        slot
    }

    /// Append a chunk after the current last entry.
    pub fn push(&mut self, begin: u32, len: u32, free: bool) -> u32 {
        let pos = self.order.len();
        self.insert(pos, begin, len, free)
    }

    /// Remove the chunk at table position `pos` and retire its slot.
    pub fn retire(&mut self, pos: usize) {
        let slot = self.order.remove(pos);
        let s = &mut self.slots[slot as usize];
        s.generation = s.generation.next();
        s.in_table = false;
        self.free_slots.push(slot);
    }

    /// Mark an occupied chunk free. Outstanding keys become stale.
    pub fn release(&mut self, slot: u32) {
        let s = &mut self.slots[slot as usize];
        s.free = true;
        s.generation = s.generation.next();
    }

    /// Iterate slot records in table order.
    pub fn iter(&self) -> impl Iterator<Item = &ChunkSlot> + '_ {
        self.order.iter().map(|&s| &self.slots[s as usize])
    }
}
