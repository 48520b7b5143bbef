//! Solver-facing buffer pair with host mapping.

use strand_arena::{ArenaConfig, ArenaError, ArenaStats, ChunkArena};
use tracing::debug;

use crate::fence::{DeviceFence, HostMapping};
use crate::particle::ParticleStore;
use crate::spring::SpringStore;

/// Arena configuration for both solver buffers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolverConfig {
    /// Particle arena configuration.
    pub particles: ArenaConfig,
    /// Spring arena configuration.
    pub springs: ArenaConfig,
}

impl SolverConfig {
    /// Default initial particle capacity in units.
    pub const DEFAULT_PARTICLE_CAPACITY: u32 = 4096;

    /// Default initial spring capacity in units.
    pub const DEFAULT_SPRING_CAPACITY: u32 = 8192;

    /// Pair two arena configurations.
    pub fn new(particles: ArenaConfig, springs: ArenaConfig) -> Self {
        Self { particles, springs }
    }

    /// Validate both arena configurations.
    pub fn validate(&self) -> Result<(), ArenaError> {
        self.particles.validate()?;
        self.springs.validate()
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            particles: ArenaConfig::new(Self::DEFAULT_PARTICLE_CAPACITY),
            springs: ArenaConfig::new(Self::DEFAULT_SPRING_CAPACITY),
        }
    }
}

/// Particle and spring arenas mirrored to a device.
///
/// Owned by the simulation driver. The arenas are reachable only through
/// [`map`](Self::map), so every allocation, compaction, and per-unit
/// write happens inside a host mapping.
#[derive(Debug)]
pub struct SolverBuffers {
    particles: ChunkArena<ParticleStore>,
    springs: ChunkArena<SpringStore>,
    fence: DeviceFence,
}

impl SolverBuffers {
    /// Create both arenas at their initial capacities.
    pub fn new(config: SolverConfig) -> Result<Self, ArenaError> {
        config.validate()?;
        let particles = ChunkArena::new(ParticleStore::new(), config.particles)?;
        let springs = ChunkArena::new(SpringStore::new(), config.springs)?;
        debug!(
            particles = particles.capacity(),
            springs = springs.capacity(),
            "solver buffers created"
        );
        Ok(Self {
            particles,
            springs,
            fence: DeviceFence::new(),
        })
    }

    /// The fence shared with device passes. Clone it for the device side.
    pub fn fence(&self) -> &DeviceFence {
        &self.fence
    }

    /// Number of completed mappings.
    pub fn upload_epoch(&self) -> u64 {
        self.fence.epoch()
    }

    /// Particle buffer size in units.
    pub fn particle_capacity(&self) -> u32 {
        self.particles.capacity()
    }

    /// Spring buffer size in units.
    pub fn spring_capacity(&self) -> u32 {
        self.springs.capacity()
    }

    /// Particle arena statistics.
    pub fn particle_stats(&self) -> ArenaStats {
        self.particles.stats()
    }

    /// Spring arena statistics.
    pub fn spring_stats(&self) -> ArenaStats {
        self.springs.stats()
    }

    /// Map both buffers for host access, blocking while a device pass runs.
    pub fn map(&mut self) -> MappedBuffers<'_> {
        let mapping = self.fence.map_host();
        MappedBuffers {
            particles: &mut self.particles,
            springs: &mut self.springs,
            mapping,
        }
    }

    /// Map both buffers if no device pass is running.
    pub fn try_map(&mut self) -> Option<MappedBuffers<'_>> {
        let mapping = self.fence.try_map_host()?;
        Some(MappedBuffers {
            particles: &mut self.particles,
            springs: &mut self.springs,
            mapping,
        })
    }
}

/// Host access to both solver arenas.
///
/// Dropping the guard (or calling [`unmap`](Self::unmap)) uploads the
/// buffers and lets device passes proceed.
#[derive(Debug)]
#[must_use = "the buffers are unmapped as soon as this guard is dropped"]
pub struct MappedBuffers<'a> {
    particles: &'a mut ChunkArena<ParticleStore>,
    springs: &'a mut ChunkArena<SpringStore>,
    mapping: HostMapping,
}

impl MappedBuffers<'_> {
    /// The particle arena.
    pub fn particles(&self) -> &ChunkArena<ParticleStore> {
        self.particles
    }

    /// The particle arena, mutably.
    pub fn particles_mut(&mut self) -> &mut ChunkArena<ParticleStore> {
        self.particles
    }

    /// The spring arena.
    pub fn springs(&self) -> &ChunkArena<SpringStore> {
        self.springs
    }

    /// The spring arena, mutably.
    pub fn springs_mut(&mut self) -> &mut ChunkArena<SpringStore> {
        self.springs
    }

    /// Both arenas at once, for owners that write particles and springs
    /// in the same pass.
    pub fn split_mut(
        &mut self,
    ) -> (
        &mut ChunkArena<ParticleStore>,
        &mut ChunkArena<SpringStore>,
    ) {
        (self.particles, self.springs)
    }

    /// Unmap now and return the new upload epoch.
    pub fn unmap(self) -> u64 {
        self.mapping.unmap()
    }
}
