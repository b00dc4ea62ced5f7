//! Seeded allocation workloads.

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// One step of a workload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    /// Allocate `size` bytes.
    Alloc { size: usize },
    /// Free the live allocation at `slot` modulo the live count.
    Free { slot: usize },
    /// Compact the pool.
    Defragment,
}

/// Deterministic stream of [`Op`]s.
///
/// The same seed always yields the same sequence. Weights are relative:
/// with the defaults, roughly half the steps allocate, 45% free and 5%
/// defragment.
pub struct Workload {
    rng: ChaCha8Rng,
    pub min_size: usize,
    pub max_size: usize,
    pub alloc_weight: u32,
    pub free_weight: u32,
    pub defrag_weight: u32,
}

impl Workload {
    pub const DEFAULT_MAX_SIZE: usize = 512;

    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            min_size: 1,
            max_size: Self::DEFAULT_MAX_SIZE,
            alloc_weight: 50,
            free_weight: 45,
            defrag_weight: 5,
        }
    }

    /// Draw request sizes from `min..=max`.
    pub fn with_sizes(mut self, min: usize, max: usize) -> Self {
        assert!(min >= 1 && min <= max, "size range must be non-empty");
        self.min_size = min;
        self.max_size = max;
        self
    }

    /// Set the relative frequency of each operation.
    pub fn with_weights(mut self, alloc: u32, free: u32, defrag: u32) -> Self {
        assert!(alloc + free + defrag > 0, "at least one weight must be set");
        self.alloc_weight = alloc;
        self.free_weight = free;
        self.defrag_weight = defrag;
        self
    }

    fn below(&mut self, bound: u64) -> u64 {
        self.rng.next_u64() % bound
    }

    pub fn next_op(&mut self) -> Op {
        let total = u64::from(self.alloc_weight + self.free_weight + self.defrag_weight);
        let roll = self.below(total);
        if roll < u64::from(self.alloc_weight) {
            let span = (self.max_size - self.min_size + 1) as u64;
            Op::Alloc {
                size: self.min_size + self.below(span) as usize,
            }
        } else if roll < u64::from(self.alloc_weight + self.free_weight) {
            Op::Free {
                slot: self.rng.next_u32() as usize,
            }
        } else {
            Op::Defragment
        }
    }

    /// The next `n` operations.
    pub fn take(&mut self, n: usize) -> Vec<Op> {
        (0..n).map(|_| self.next_op()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        assert_eq!(Workload::new(42).take(100), Workload::new(42).take(100));
        assert_ne!(Workload::new(1).take(100), Workload::new(2).take(100));
    }

    #[test]
    fn sizes_respect_range() {
        let mut w = Workload::new(7).with_sizes(16, 32).with_weights(1, 0, 0);
        for op in w.take(200) {
            match op {
                Op::Alloc { size } => assert!((16..=32).contains(&size)),
                other => panic!("unexpected op {other:?}"),
            }
        }
    }

    #[test]
    fn zero_weight_ops_never_appear() {
        let mut w = Workload::new(3).with_weights(1, 1, 0);
        assert!(w.take(500).iter().all(|op| *op != Op::Defragment));
    }
}
