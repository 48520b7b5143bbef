//! Per-particle field arrays.

use strand_core::UnitStore;

/// Parallel arrays holding one record per particle.
///
/// | field       | layout                  |
/// |-------------|-------------------------|
/// | positions   | `[x, y, z, inverse_mass]` |
/// | velocities  | `[x, y, z]`             |
/// | phases      | solver phase/group flags |
///
/// An inverse mass of zero pins the particle in place.
#[derive(Clone, Debug, Default)]
pub struct ParticleStore {
    positions: Vec<[f32; 4]>,
    velocities: Vec<[f32; 3]>,
    phases: Vec<i32>,
}

impl ParticleStore {
    /// Create an empty store. The owning arena sizes it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Positions with inverse mass in the fourth component.
    pub fn positions(&self) -> &[[f32; 4]] {
        &self.positions
    }

    /// Mutable positions.
    pub fn positions_mut(&mut self) -> &mut [[f32; 4]] {
        &mut self.positions
    }

    /// Velocities.
    pub fn velocities(&self) -> &[[f32; 3]] {
        &self.velocities
    }

    /// Mutable velocities.
    pub fn velocities_mut(&mut self) -> &mut [[f32; 3]] {
        &mut self.velocities
    }

    /// Phase flags.
    pub fn phases(&self) -> &[i32] {
        &self.phases
    }

    /// Mutable phase flags.
    pub fn phases_mut(&mut self) -> &mut [i32] {
        &mut self.phases
    }

    /// Write every field of one particle.
    pub fn set(&mut self, index: usize, position: [f32; 4], velocity: [f32; 3], phase: i32) {
        self.positions[index] = position;
        self.velocities[index] = velocity;
        self.phases[index] = phase;
    }

    /// Inverse mass of one particle.
    pub fn inverse_mass(&self, index: usize) -> f32 {
        self.positions[index][3]
    }

    /// Host memory held by the arrays, in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.positions.len() * std::mem::size_of::<[f32; 4]>()
            + self.velocities.len() * std::mem::size_of::<[f32; 3]>()
            + self.phases.len() * std::mem::size_of::<i32>()
    }
}

impl UnitStore for ParticleStore {
    fn len(&self) -> usize {
        self.positions.len()
    }

    fn resize(&mut self, new_len: usize) {
        self.positions.resize(new_len, [0.0; 4]);
        self.velocities.resize(new_len, [0.0; 3]);
        self.phases.resize(new_len, 0);
    }

    fn copy_unit(&mut self, to: usize, from: usize) {
        self.positions[to] = self.positions[from];
        self.velocities[to] = self.velocities[from];
        self.phases[to] = self.phases[from];
    }

    fn copy(&mut self, dst: usize, count: usize, src: usize) {
        let range = src..src + count;
        self.positions.copy_within(range.clone(), dst);
        self.velocities.copy_within(range.clone(), dst);
        self.phases.copy_within(range, dst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(n: usize) -> ParticleStore {
        let mut s = ParticleStore::new();
        s.resize(n);
        for i in 0..n {
            let f = i as f32;
            s.set(i, [f, f, f, 1.0], [f, 0.0, 0.0], i as i32);
        }
        s
    }

    #[test]
    fn resize_keeps_every_array_in_step() {
        let mut s = ParticleStore::new();
        s.resize(5);
        assert_eq!(s.len(), 5);
        assert_eq!(s.velocities().len(), 5);
        assert_eq!(s.phases().len(), 5);
        assert_eq!(s.positions()[4], [0.0; 4]);
    }

    #[test]
    fn shrink_discards_tail() {
        let mut s = store_with(6);
        s.resize(2);
        assert_eq!(s.len(), 2);
        assert_eq!(s.phases(), &[0, 1]);
    }

    #[test]
    fn copy_unit_moves_all_fields() {
        let mut s = store_with(4);
        s.copy_unit(0, 3);
        assert_eq!(s.positions()[0], [3.0, 3.0, 3.0, 1.0]);
        assert_eq!(s.velocities()[0], [3.0, 0.0, 0.0]);
        assert_eq!(s.phases()[0], 3);
    }

    #[test]
    fn batch_copy_handles_overlapping_backward_shift() {
        let mut s = store_with(6);
        s.copy(1, 4, 2);
        assert_eq!(&s.phases()[1..5], &[2, 3, 4, 5]);
        assert_eq!(s.positions()[1][0], 2.0);
    }

    #[test]
    fn inverse_mass_reads_fourth_component() {
        let mut s = store_with(2);
        s.positions_mut()[1][3] = 0.0;
        assert_eq!(s.inverse_mass(0), 1.0);
        assert_eq!(s.inverse_mass(1), 0.0);
    }

    #[test]
    fn memory_bytes_counts_all_arrays() {
        let s = store_with(10);
        assert_eq!(s.memory_bytes(), 10 * (16 + 12 + 4));
    }
}
