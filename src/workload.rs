//! The synthetic CPU-bound workload.
//!
//! `workload` runs a tight `hash * 31 + value` loop, reduced modulo [`MODULUS`]
//! on every step. The result carries no meaning beyond being deterministic; the
//! loop exists to burn CPU time roughly proportional to the iteration count.

use std::fmt;

use num_bigint::BigUint;

/// Every step is reduced modulo 2^30.
pub const MODULUS: u64 = 2 << 29;

/// Integer representation used by [`workload`] for both the counter and the
/// accumulator.
///
/// `u64` is the plain variant. `BigUint` is the arbitrary-precision one: it
/// accepts any seed or count and pays for it with heap-backed arithmetic.
pub trait HashWord: Clone + fmt::Display {
    fn modulus() -> Self;

    /// One loop iteration: `((self << 5) - self + value) mod modulus`.
    fn step(&self, value: &Self, modulus: &Self) -> Self;

    fn is_zero(&self) -> bool;

    fn decrement(&mut self);
}

// MODULUS divides 2^64, so wrapping arithmetic followed by the reduction gives
// the exact result for any seed.
impl HashWord for u64 {
    fn modulus() -> Self {
        MODULUS
    }

    #[inline(always)]
    fn step(&self, value: &Self, modulus: &Self) -> Self {
        (self << 5).wrapping_sub(*self).wrapping_add(*value) % modulus
    }

    #[inline(always)]
    fn is_zero(&self) -> bool {
        *self == 0
    }

    #[inline(always)]
    fn decrement(&mut self) {
        *self -= 1;
    }
}

impl HashWord for BigUint {
    fn modulus() -> Self {
        BigUint::from(MODULUS)
    }

    fn step(&self, value: &Self, modulus: &Self) -> Self {
        // 32h - h never underflows
        ((self << 5u32) - self + value) % modulus
    }

    fn is_zero(&self) -> bool {
        self.bits() == 0
    }

    fn decrement(&mut self) {
        *self -= 1u32;
    }
}

/// Which [`HashWord`] a run uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Width {
    #[default]
    Plain,
    Wide,
}

impl Width {
    /// Runs the workload for counts and seeds that fit a `u64`.
    ///
    /// The result always fits too: it is either the seed or below `MODULUS`.
    pub fn run(self, value: u64, seed: u64) -> u64 {
        match self {
            Width::Plain => workload(value, seed),
            Width::Wide => {
                let hash = workload(BigUint::from(value), BigUint::from(seed));
                to_u64(&hash).unwrap_or(u64::MAX)
            }
        }
    }

    pub fn is_wide(self) -> bool {
        self == Width::Wide
    }
}

/// `n` as a `u64`, if it fits.
pub fn to_u64(n: &BigUint) -> Option<u64> {
    if n.bits() > 64 {
        return None;
    }
    Some(n.iter_u64_digits().next().unwrap_or(0))
}

/// Hashes `value, value - 1, ..., 1` into an accumulator starting at `seed`.
pub fn workload<W: HashWord>(mut value: W, seed: W) -> W {
    let modulus = W::modulus();
    let mut hash = seed;
    while !value.is_zero() {
        hash = hash.step(&value, &modulus);
        value.decrement();
    }

    hash
}
