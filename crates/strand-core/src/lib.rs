//! Core types and traits for Strand unit arenas.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the abstractions shared across the Strand workspace: arena identity,
//! slot generations, and the [`UnitStore`] backing-store contract.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod id;
pub mod traits;

pub use id::{ArenaId, Generation};
pub use traits::UnitStore;
