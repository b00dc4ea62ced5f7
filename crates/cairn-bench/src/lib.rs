//! Benchmark profiles for the Cairn memory pool.
//!
//! - [`small_object_profile`]: many short-lived 16 to 128 byte allocations
//! - [`mixed_profile`]: wide size range with periodic compaction
//! - [`fragmented_pool`]: a pool left with every other block free

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use cairn_core::Handle;
use cairn_pool::{HandlePool, PoolConfig};
use cairn_test_utils::Workload;

/// Arena size used by every profile.
pub const PROFILE_POOL_SIZE: usize = 1 << 20;

/// Handle capacity used by every profile.
pub const PROFILE_MAX_HANDLES: usize = 4096;

/// A fresh pool sized for the profiles.
pub fn profile_pool() -> HandlePool {
    HandlePool::new(PoolConfig::new(PROFILE_POOL_SIZE).with_max_handles(PROFILE_MAX_HANDLES))
        .unwrap()
}

/// Small, frequent allocations with no compaction.
pub fn small_object_profile(seed: u64) -> Workload {
    Workload::new(seed)
        .with_sizes(16, 128)
        .with_weights(55, 45, 0)
}

/// Sizes from 1 byte to 4 KiB with 2% defragmentation steps.
pub fn mixed_profile(seed: u64) -> Workload {
    Workload::new(seed)
        .with_sizes(1, 4096)
        .with_weights(50, 48, 2)
}

/// Fill a profile pool with `count` blocks of `size` bytes and free every
/// other one, leaving `count / 2` live handles and as many gaps.
pub fn fragmented_pool(count: usize, size: usize) -> (HandlePool, Vec<Handle>) {
    let pool = profile_pool();
    let all: Vec<Handle> = (0..count).map_while(|_| pool.alloc(size).ok()).collect();
    let mut live = Vec::with_capacity(all.len() / 2);
    for (i, h) in all.into_iter().enumerate() {
        if i % 2 == 0 {
            pool.free(h).unwrap();
        } else {
            live.push(h);
        }
    }
    (pool, live)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragmented_pool_has_gaps() {
        let (pool, live) = fragmented_pool(64, 256);
        let stats = pool.stats().unwrap();
        assert_eq!(live.len(), 32);
        assert_eq!(stats.live_blocks, 32);
        assert!(stats.free_blocks >= 32);
    }

    #[test]
    fn profiles_are_deterministic() {
        assert_eq!(
            small_object_profile(1).take(50),
            small_object_profile(1).take(50)
        );
        assert_eq!(mixed_profile(2).take(50), mixed_profile(2).take(50));
    }
}
