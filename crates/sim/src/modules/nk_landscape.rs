//! NK fitness landscapes.

use crate::base::{BitVector, Random};

/// A tunably rugged fitness landscape over bit strings of length `n`.
///
/// Each locus `i` contributes `table[i][w]`, where `w` is the `k + 1` bit
/// window starting at `i` (wrapping around the end) read little-endian:
/// `w = Σ_{j=0..=k} bit[(i + j) mod n] << j`. Fitness is the mean
/// contribution over all loci.
#[derive(Debug, Clone, PartialEq)]
pub struct NkLandscape {
    n: usize,
    k: usize,
    state_count: usize,
    table: Vec<f64>,
}

impl NkLandscape {
    /// Largest supported `k`, keeping the table addressable.
    pub const MAX_K: usize = 24;

    /// Draw a table of uniform `[0, 1)` values, locus by locus.
    ///
    /// # Panics
    /// Panics unless `k < n` and `k <= MAX_K`; callers validate first.
    pub fn new(n: usize, k: usize, random: &mut Random) -> Self {
        assert!(k < n && k <= Self::MAX_K, "invalid NK parameters n={n} k={k}");
        let state_count = 1usize << (k + 1);
        let table = (0..n * state_count).map(|_| random.get_double()).collect();
        Self {
            n,
            k,
            state_count,
            table,
        }
    }

    /// Landscape with an explicit row-major table of `n * 2^(k+1)` entries.
    pub fn from_table(n: usize, k: usize, table: Vec<f64>) -> Option<Self> {
        if k >= n || k > Self::MAX_K {
            return None;
        }
        let state_count = 1usize << (k + 1);
        (table.len() == n * state_count).then_some(Self {
            n,
            k,
            state_count,
            table,
        })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn state_count(&self) -> usize {
        self.state_count
    }

    /// Contribution of locus `locus` in window state `state`.
    #[inline]
    pub fn value(&self, locus: usize, state: usize) -> f64 {
        self.table[locus * self.state_count + state]
    }

    /// Window state of locus `locus` in `bits`.
    #[inline]
    pub fn state(&self, locus: usize, bits: &BitVector) -> usize {
        (0..=self.k)
            .filter(|&j| bits.get((locus + j) % self.n))
            .fold(0, |acc, j| acc | (1 << j))
    }

    /// Mean locus contribution. `bits` must have exactly `n` bits.
    pub fn fitness(&self, bits: &BitVector) -> Option<f64> {
        if bits.len() != self.n {
            return None;
        }
        let total: f64 = (0..self.n).map(|i| self.value(i, self.state(i, bits))).sum();
        Some(total / self.n as f64)
    }

    /// Mean of the per-locus maxima: an upper bound on fitness, reached
    /// exactly when loci are independent (`k == 0`).
    pub fn locus_max_bound(&self) -> f64 {
        let total: f64 = (0..self.n)
            .map(|i| {
                (0..self.state_count)
                    .map(|s| self.value(i, s))
                    .fold(f64::NEG_INFINITY, f64::max)
            })
            .sum();
        total / self.n as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_table() {
        let a = NkLandscape::new(10, 2, &mut Random::new(4));
        let b = NkLandscape::new(10, 2, &mut Random::new(4));
        assert_eq!(a, b);
        assert_eq!(a.state_count(), 8);
    }

    #[test]
    fn test_fitness_formula_by_hand() {
        // n = 3, k = 1: four window states per locus.
        let table = vec![
            0.0, 0.1, 0.2, 0.3, // locus 0
            0.4, 0.5, 0.6, 0.7, // locus 1
            0.8, 0.9, 1.0, 0.0, // locus 2
        ];
        let nk = NkLandscape::from_table(3, 1, table).unwrap();
        let bits: BitVector = "110".parse().unwrap();
        // locus 0: bits 0,1 = 1,1 -> 3; locus 1: bits 1,2 = 1,0 -> 1; locus 2: bits 2,0 = 0,1 -> 2
        assert_eq!(nk.state(0, &bits), 3);
        assert_eq!(nk.state(1, &bits), 1);
        assert_eq!(nk.state(2, &bits), 2);
        let expected = (0.3 + 0.5 + 1.0) / 3.0;
        assert!((nk.fitness(&bits).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_wrong_length_has_no_fitness() {
        let nk = NkLandscape::new(8, 1, &mut Random::new(1));
        assert_eq!(nk.fitness(&BitVector::new(7)), None);
    }

    #[test]
    fn test_k_zero_bound_is_reachable() {
        let nk = NkLandscape::new(12, 0, &mut Random::new(3));
        let best: Vec<bool> = (0..12).map(|i| nk.value(i, 1) > nk.value(i, 0)).collect();
        let fitness = nk.fitness(&BitVector::from_bools(&best)).unwrap();
        assert!((fitness - nk.locus_max_bound()).abs() < 1e-12);
    }

    #[test]
    fn test_from_table_validates_shape() {
        assert!(NkLandscape::from_table(3, 1, vec![0.0; 11]).is_none());
        assert!(NkLandscape::from_table(3, 3, vec![0.0; 48]).is_none());
    }
}
