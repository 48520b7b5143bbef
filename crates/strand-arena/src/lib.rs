//! Chunked unit arenas with online compaction for Strand solvers.
//!
//! A [`ChunkArena`] decides *where* fixed-size records ("units") live in a
//! growable linear store. Collaborators request a run of `N` units and get
//! back a [`ChunkHandle`]; they address their data as `begin + local`
//! through the arena's [`UnitStore`](strand_core::UnitStore), re-deriving
//! `begin` from the handle before every access because compaction may
//! relocate occupied runs.
//!
//! # Architecture
//!
//! ```text
//! ChunkArena<S: UnitStore> (orchestrator)
//! ├── ChunkTable
//! │   ├── ChunkSlot[]     (slab, recycled through a free list)
//! │   └── order: u32[]    (slot indices sorted by begin, partitions [0, capacity))
//! ├── S                   (parallel arrays, resized in lockstep with capacity)
//! └── biggest-free-run hint, occupancy, counters
//! ```
//!
//! # Compaction modes
//!
//! - **Merge-only:** coalesces adjacent free chunks. Never moves data.
//!   Runs on every deallocation (neighbour coalescing) and before an
//!   allocation decision that needs an exact biggest-free-run.
//! - **Merge-and-trim:** slides every occupied chunk down to the lowest
//!   free position, leaving one trailing free run. Moves data through the
//!   store. Runs when shrinking capacity, when an allocation only fits
//!   after defragmentation, or on request via [`ChunkArena::compact`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arena;
pub mod chunk;
pub mod compact;
pub mod config;
pub mod error;
pub mod handle;
pub mod stats;
mod table;

// Public re-exports for the primary API surface.
pub use arena::ChunkArena;
pub use chunk::Chunk;
pub use compact::{CompactionReport, Relocation};
pub use config::{ArenaConfig, Growth};
pub use error::ArenaError;
pub use handle::{ChunkHandle, ChunkKey};
pub use stats::ArenaStats;
