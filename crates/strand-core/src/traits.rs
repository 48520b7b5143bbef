//! The backing-store contract driven by arena allocators.

/// A set of parallel arrays of fixed-size records ("units").
///
/// Arenas decide *where* units live; stores decide *what* a unit holds.
/// Every parallel array is kept at the same length, and an arena keeps
/// that length equal to its capacity.
///
/// # Overlap contract
///
/// [`copy`](UnitStore::copy) is only requested for disjoint ranges or
/// for backward shifts (`dst <= src`). Ascending per-unit copies are
/// correct for both, so the default implementation is a plain loop.
/// Implementations that override it must keep that guarantee.
pub trait UnitStore {
    /// Current length of every parallel array, in units.
    fn len(&self) -> usize;

    /// Whether the store holds no units.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grow or shrink every parallel array to `new_len` units.
    ///
    /// Existing units keep their positions. Units past the old length
    /// hold default values after growth; units past `new_len` are
    /// discarded on shrink.
    fn resize(&mut self, new_len: usize);

    /// Copy every field of unit `from` into unit `to`.
    ///
    /// `to == from` is a no-op.
    fn copy_unit(&mut self, to: usize, from: usize);

    /// Copy `count` units starting at `src` to the range starting at `dst`.
    fn copy(&mut self, dst: usize, count: usize, src: usize) {
        debug_assert!(
            dst <= src || dst >= src + count,
            "forward-overlapping copy: dst={dst} src={src} count={count}"
        );
        for i in 0..count {
            self.copy_unit(dst + i, src + i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal store that only overrides the required methods.
    struct Units(Vec<u32>);

    impl UnitStore for Units {
        fn len(&self) -> usize {
            self.0.len()
        }

        fn resize(&mut self, new_len: usize) {
            self.0.resize(new_len, 0);
        }

        fn copy_unit(&mut self, to: usize, from: usize) {
            self.0[to] = self.0[from];
        }
    }

    #[test]
    fn default_copy_handles_disjoint_ranges() {
        let mut s = Units(vec![1, 2, 3, 0, 0, 0]);
        s.copy(3, 3, 0);
        assert_eq!(s.0, vec![1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn default_copy_handles_overlapping_backward_shift() {
        let mut s = Units(vec![0, 0, 1, 2, 3, 4]);
        s.copy(0, 4, 2);
        assert_eq!(&s.0[..4], &[1, 2, 3, 4]);
    }

    #[test]
    fn copy_unit_onto_itself_is_noop() {
        let mut s = Units(vec![7, 8]);
        s.copy_unit(1, 1);
        assert_eq!(s.0, vec![7, 8]);
    }

    #[test]
    fn is_empty_follows_len() {
        let mut s = Units(Vec::new());
        assert!(s.is_empty());
        s.resize(4);
        assert!(!s.is_empty());
        assert_eq!(s.0, vec![0; 4]);
    }
}
