//! Occupancy and compaction counters for an arena.

/// Point-in-time view of an arena's table plus cumulative counters.
///
/// Table-derived fields are recomputed on every
/// [`ChunkArena::stats`](crate::ChunkArena::stats) call; counters
/// accumulate over the arena's lifetime.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Current capacity in units.
    pub capacity: u32,
    /// Units owned by occupied chunks.
    pub occupied_units: u32,
    /// Units in the free pool.
    pub free_units: u32,
    /// Number of chunks in the table.
    pub chunk_count: usize,
    /// Number of free chunks in the table.
    pub free_chunk_count: usize,
    /// Exact size of the largest free chunk.
    pub biggest_free_run: u32,
    /// Cumulative number of capacity increases.
    pub grow_events: u64,
    /// Cumulative number of full merge-only passes.
    pub merge_passes: u64,
    /// Cumulative number of merge-and-trim passes.
    pub trim_passes: u64,
    /// Cumulative number of units copied by merge-and-trim passes.
    pub units_relocated: u64,
}

impl ArenaStats {
    /// Fraction of free units outside the largest free run, in `[0, 1]`.
    ///
    /// Zero when all free space is one contiguous run (or there is none).
    pub fn fragmentation(&self) -> f64 {
        if self.free_units == 0 {
            return 0.0;
        }
        1.0 - f64::from(self.biggest_free_run) / f64::from(self.free_units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let s = ArenaStats::default();
        assert_eq!(s.capacity, 0);
        assert_eq!(s.grow_events, 0);
        assert_eq!(s.fragmentation(), 0.0);
    }

    #[test]
    fn fragmentation_of_split_free_space() {
        let s = ArenaStats {
            free_units: 8,
            biggest_free_run: 2,
            ..ArenaStats::default()
        };
        assert_eq!(s.fragmentation(), 0.75);
    }
}
