//! Benchmark workloads for Strand arenas.
//!
//! - [`churn_ops`]: seeded allocate/free/resize streams
//! - [`run_churn`]: replay a stream against any arena
//! - [`fragmented_particles`]: a particle arena with every other chunk freed

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strand_arena::{ArenaConfig, ArenaError, ChunkArena, ChunkHandle};
use strand_core::UnitStore;
use strand_store::ParticleStore;

/// Shape of a generated churn stream.
#[derive(Clone, Debug)]
pub struct ChurnProfile {
    /// RNG seed; equal seeds give equal streams.
    pub seed: u64,
    /// Number of operations to generate.
    pub ops: usize,
    /// Largest chunk size requested, in units.
    pub max_chunk: u32,
    /// Live chunk count the stream hovers around.
    pub live_target: usize,
}

impl ChurnProfile {
    /// Small bodies churning around a steady population.
    pub fn steady(seed: u64) -> Self {
        Self {
            seed,
            ops: 10_000,
            max_chunk: 64,
            live_target: 256,
        }
    }
}

/// One step of a churn stream. Indices refer to the live list at replay time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChurnOp {
    /// Allocate a chunk of this many units.
    Allocate(u32),
    /// Free the live chunk at `index % live.len()`.
    Free(usize),
    /// Resize the live chunk at `index % live.len()`.
    Resize(usize, u32),
}

/// Generate a deterministic churn stream.
///
/// Below `live_target` the stream mostly allocates; above it, it mostly
/// frees, so the population oscillates around the target.
pub fn churn_ops(profile: &ChurnProfile) -> Vec<ChurnOp> {
    let mut rng = ChaCha8Rng::seed_from_u64(profile.seed);
    let mut live = 0usize;
    let mut ops = Vec::with_capacity(profile.ops);
    for _ in 0..profile.ops {
        let roll = rng.next_u32() % 100;
        let size = 1 + rng.next_u32() % profile.max_chunk.max(1);
        let index = rng.next_u32() as usize;
        let alloc_bias = if live < profile.live_target { 60 } else { 30 };
        let op = if live == 0 || roll < alloc_bias {
            live += 1;
            ChurnOp::Allocate(size)
        } else if roll < alloc_bias + 15 {
            ChurnOp::Resize(index, size)
        } else {
            live -= 1;
            ChurnOp::Free(index)
        };
        ops.push(op);
    }
    ops
}

/// What a churn replay did to the arena.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChurnOutcome {
    /// Allocations or resizes refused with `CapacityExhausted`.
    pub exhausted: usize,
    /// Largest capacity seen during the replay.
    pub peak_capacity: u32,
    /// Chunks still live at the end.
    pub live: usize,
}

/// Replay `ops` against `arena`, freeing every live chunk at the end.
///
/// Errors other than `CapacityExhausted` are returned.
pub fn run_churn<S: UnitStore>(
    arena: &mut ChunkArena<S>,
    ops: &[ChurnOp],
) -> Result<ChurnOutcome, ArenaError> {
    let mut live: Vec<ChunkHandle> = Vec::new();
    let mut outcome = ChurnOutcome::default();
    for &op in ops {
        let result = match op {
            ChurnOp::Allocate(size) => arena.allocate(size).map(|h| live.push(h)),
            ChurnOp::Free(_) | ChurnOp::Resize(..) if live.is_empty() => Ok(()),
            ChurnOp::Free(index) => {
                let h = live.swap_remove(index % live.len());
                arena.deallocate(h);
                Ok(())
            }
            ChurnOp::Resize(index, size) => {
                let slot = index % live.len();
                arena.resize(live[slot], size).map(|h| live[slot] = h)
            }
        };
        match result {
            Ok(()) => {}
            Err(ArenaError::CapacityExhausted { .. }) => outcome.exhausted += 1,
            Err(e) => return Err(e),
        }
        outcome.peak_capacity = outcome.peak_capacity.max(arena.capacity());
    }
    outcome.live = live.len();
    for h in live {
        arena.deallocate(h);
    }
    Ok(outcome)
}

/// Particle arena of `chunks` chunks of `chunk_size` units, with every
/// even-indexed chunk freed. Free space is maximally scattered.
pub fn fragmented_particles(chunks: u32, chunk_size: u32) -> ChunkArena<ParticleStore> {
    let mut arena = ChunkArena::new(ParticleStore::new(), ArenaConfig::fixed(chunks * chunk_size))
        .expect("fixed config is always valid");
    let handles: Vec<ChunkHandle> = (0..chunks)
        .map(|_| arena.allocate(chunk_size).expect("arena sized to fit"))
        .collect();
    for h in handles.into_iter().step_by(2) {
        arena.deallocate(h);
    }
    arena
}
