//! Device-mirrored particle and spring stores for Strand solvers.
//!
//! Concrete [`UnitStore`](strand_core::UnitStore) layouts plus the
//! host/device handoff that brackets every per-unit access:
//!
//! ```text
//! SolverBuffers (owned by the simulation driver)
//! ├── ChunkArena<ParticleStore>   positions+inv-mass, velocities, phases
//! ├── ChunkArena<SpringStore>     endpoints, rest lengths, stiffness
//! └── DeviceFence                 map() blocks while a device pass runs
//!         │
//!         └── MappedBuffers<'_>   the only way to reach the arenas;
//!                                 dropping it is the upload point
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod fence;
pub mod particle;
pub mod solver;
pub mod spring;

pub use fence::{DeviceFence, DevicePass};
pub use particle::ParticleStore;
pub use solver::{MappedBuffers, SolverBuffers, SolverConfig};
pub use spring::SpringStore;
