//! Integration test: seeded workloads checked against the shadow model.
//!
//! Every step is applied to both a real pool and `ShadowPool`; the model
//! then reads each live payload back through the pool, and the pool's
//! own structural check runs after every step.

use cairn_core::HandleAllocator;
use cairn_pool::{FixedPool, HandlePool, PoolConfig};
use cairn_test_utils::{ShadowPool, Workload};

fn run<P: HandleAllocator>(pool: &P, check: impl Fn(&P), seed: u64, steps: usize) -> ShadowPool {
    let mut shadow = ShadowPool::new();
    let mut workload = Workload::new(seed);
    for _ in 0..steps {
        shadow.apply(pool, workload.next_op()).unwrap();
        shadow.verify(pool).unwrap();
        check(pool);
    }
    shadow
}

#[test]
fn dynamic_pool_matches_model_over_many_seeds() {
    for seed in 0..16 {
        let pool = HandlePool::new(PoolConfig::new(8 * 1024).with_max_handles(64)).unwrap();
        let shadow = run(&pool, |p| p.check_invariants().unwrap(), seed, 300);
        assert_eq!(pool.handles_in_use().unwrap(), shadow.len());
    }
}

#[test]
fn fixed_pool_matches_model() {
    let pool: FixedPool<{ 16 * 1024 }, 128> = FixedPool::new();
    let shadow = run(&pool, |p| p.check_invariants().unwrap(), 99, 1000);

    let handles: Vec<_> = shadow.handles().collect();
    let mut shadow = shadow;
    for h in handles {
        shadow.free(&pool, h).unwrap();
    }
    assert!(shadow.is_empty());
    assert_eq!(pool.stats().unwrap().free_blocks, 1);
}

#[test]
fn tiny_pool_under_constant_pressure() {
    // Small arena, large requests: most allocations fail and the pool
    // keeps fragmenting and compacting.
    let pool = HandlePool::new(PoolConfig::new(1024)).unwrap();
    let mut shadow = ShadowPool::new();
    let mut workload = Workload::new(5).with_sizes(32, 400).with_weights(6, 3, 1);
    for _ in 0..2000 {
        shadow.apply(&pool, workload.next_op()).unwrap();
        shadow.verify(&pool).unwrap();
        pool.check_invariants().unwrap();
    }
}
