//! Per-spring constraint arrays.

use strand_core::UnitStore;

/// Parallel arrays holding one distance constraint per unit.
///
/// Endpoints are absolute particle indices in the particle store; the
/// owner rewrites them whenever it re-derives its particle positions.
#[derive(Clone, Debug, Default)]
pub struct SpringStore {
    endpoints: Vec<[i32; 2]>,
    rest_lengths: Vec<f32>,
    stiffness: Vec<f32>,
}

impl SpringStore {
    /// Create an empty store. The owning arena sizes it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Particle index pairs.
    pub fn endpoints(&self) -> &[[i32; 2]] {
        &self.endpoints
    }

    /// Mutable particle index pairs.
    pub fn endpoints_mut(&mut self) -> &mut [[i32; 2]] {
        &mut self.endpoints
    }

    /// Rest lengths.
    pub fn rest_lengths(&self) -> &[f32] {
        &self.rest_lengths
    }

    /// Mutable rest lengths.
    pub fn rest_lengths_mut(&mut self) -> &mut [f32] {
        &mut self.rest_lengths
    }

    /// Stiffness coefficients.
    pub fn stiffness(&self) -> &[f32] {
        &self.stiffness
    }

    /// Mutable stiffness coefficients.
    pub fn stiffness_mut(&mut self) -> &mut [f32] {
        &mut self.stiffness
    }

    /// Write every field of one spring.
    pub fn set(&mut self, index: usize, endpoints: [i32; 2], rest_length: f32, stiffness: f32) {
        self.endpoints[index] = endpoints;
        self.rest_lengths[index] = rest_length;
        self.stiffness[index] = stiffness;
    }

    /// Host memory held by the arrays, in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.endpoints.len() * std::mem::size_of::<[i32; 2]>()
            + (self.rest_lengths.len() + self.stiffness.len()) * std::mem::size_of::<f32>()
    }
}

impl UnitStore for SpringStore {
    fn len(&self) -> usize {
        self.endpoints.len()
    }

    fn resize(&mut self, new_len: usize) {
        self.endpoints.resize(new_len, [0, 0]);
        self.rest_lengths.resize(new_len, 0.0);
        self.stiffness.resize(new_len, 0.0);
    }

    fn copy_unit(&mut self, to: usize, from: usize) {
        self.endpoints[to] = self.endpoints[from];
        self.rest_lengths[to] = self.rest_lengths[from];
        self.stiffness[to] = self.stiffness[from];
    }

    fn copy(&mut self, dst: usize, count: usize, src: usize) {
        let range = src..src + count;
        self.endpoints.copy_within(range.clone(), dst);
        self.rest_lengths.copy_within(range.clone(), dst);
        self.stiffness.copy_within(range, dst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_and_set_round_trip() {
        let mut s = SpringStore::new();
        s.resize(3);
        s.set(2, [4, 5], 0.5, 0.9);
        assert_eq!(s.endpoints()[2], [4, 5]);
        assert_eq!(s.rest_lengths()[2], 0.5);
        assert_eq!(s.stiffness()[2], 0.9);
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn copy_moves_every_field() {
        let mut s = SpringStore::new();
        s.resize(4);
        s.set(2, [1, 2], 1.5, 0.25);
        s.set(3, [3, 4], 2.5, 0.75);
        s.copy(0, 2, 2);
        assert_eq!(&s.endpoints()[..2], &[[1, 2], [3, 4]]);
        assert_eq!(&s.rest_lengths()[..2], &[1.5, 2.5]);
        assert_eq!(&s.stiffness()[..2], &[0.25, 0.75]);
    }

    #[test]
    fn memory_bytes_counts_all_arrays() {
        let mut s = SpringStore::new();
        s.resize(4);
        assert_eq!(s.memory_bytes(), 4 * (8 + 4 + 4));
    }
}
