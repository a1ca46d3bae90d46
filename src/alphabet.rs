use itertools::Itertools;
use rand::Rng;
use serde::Serialize;

use crate::error::{SimError, SimResult};

/// The nucleotide alphabet, in enumeration order.
pub const BASES: [u8; 4] = *b"ACGT";

/// Each unit of weight contributes this many copies of its base to the pool.
///
/// A pool built from weights `(1, 1, 1, 1)` therefore has 16 entries. Only the ratio between
/// weights affects the draw probabilities; the multiplier is kept so that pool sizes match
/// datasets produced by earlier versions of the simulator.
pub const POOL_MULTIPLIER: usize = 4;

/// Largest pool that will be built, in entries (one byte each). Weights summing to more than
/// `MAX_POOL_LEN / POOL_MULTIPLIER` are rejected rather than allocated.
pub const MAX_POOL_LEN: usize = 1 << 26;

/// Relative selection weights for A, C, G and T.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Weights {
    pub a: u32,
    pub c: u32,
    pub g: u32,
    pub t: u32,
}

impl Weights {
    pub fn new(a: u32, c: u32, g: u32, t: u32) -> Self {
        Weights { a, c, g, t }
    }

    /// Weights in `BASES` order.
    pub fn as_array(&self) -> [u32; 4] {
        [self.a, self.c, self.g, self.t]
    }

    pub fn is_all_zero(&self) -> bool {
        self.as_array().iter().all(|w| *w == 0)
    }
}

impl std::fmt::Display for Weights {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pairs = BASES
            .iter()
            .zip(self.as_array())
            .map(|(b, w)| format!("{}={}", *b as char, w))
            .join(" ");
        f.write_str(&pairs)
    }
}

/// A flat pool of bases in which every base occurs `weight * POOL_MULTIPLIER` times. Drawing an
/// index uniformly from the pool selects each base with probability proportional to its weight.
///
/// The pool is immutable once built, so it can be shared by reference between generation workers
/// without any locking.
#[derive(Debug, Clone)]
pub struct WeightedAlphabet {
    pool: Vec<u8>,
}

impl WeightedAlphabet {
    /// Builds the pool. All-zero weights produce an empty pool, which is legal to construct but
    /// cannot be drawn from; see [`WeightedAlphabet::draw`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the pool would hold more than `MAX_POOL_LEN` entries.
    pub fn new(weights: Weights) -> SimResult<Self> {
        let total: u64 = weights.as_array().iter().map(|w| u64::from(*w)).sum::<u64>()
            * POOL_MULTIPLIER as u64;
        if total > MAX_POOL_LEN as u64 {
            return Err(SimError::invalid(format!(
                "base weights {weights} need a pool of {total} entries, the limit is {MAX_POOL_LEN}"
            )));
        }

        let counts = weights.as_array().map(|w| w as usize * POOL_MULTIPLIER);
        let total = total as usize;

        let mut pool = Vec::with_capacity(total);
        for (base, count) in BASES.iter().zip(counts) {
            pool.extend(itertools::repeat_n(*base, count));
        }

        Ok(WeightedAlphabet { pool })
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Draws one base uniformly from the pool's index space.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the pool is empty (all weights were zero).
    #[inline]
    pub fn draw<R: Rng>(&self, rng: &mut R) -> SimResult<u8> {
        if self.pool.is_empty() {
            return Err(SimError::invalid(
                "all base weights are zero, there is nothing to draw from",
            ));
        }
        Ok(self.pool[rng.random_range(0..self.pool.len())])
    }
}
