//! Integration tests: end-to-end allocation scenarios on small pools.
//!
//! Each scenario drives a `HandlePool` through the public API only and
//! checks block layout, error codes and payload contents.

use cairn_core::{Handle, PoolError, PoolStatus};
use cairn_pool::{HandlePool, PoolConfig};
use cairn_test_utils::{PATTERN_A, PATTERN_B, PATTERN_C};

fn pool(pool_size: usize) -> HandlePool {
    HandlePool::new(PoolConfig::new(pool_size)).unwrap()
}

fn payload_is(pool: &HandlePool, handle: Handle, len: usize, byte: u8) -> bool {
    pool.with_payload(handle, |p| p[..len].iter().all(|&b| b == byte))
        .unwrap()
}

#[test]
fn three_patterned_allocations_in_1k_pool() {
    let p = pool(1024);
    let a = p.alloc(100).unwrap();
    let b = p.alloc(200).unwrap();
    let c = p.alloc(300).unwrap();
    assert_eq!((a, b, c), (Handle(0), Handle(1), Handle(2)));

    p.with_payload_mut(a, |bytes| bytes[..100].fill(PATTERN_A)).unwrap();
    p.with_payload_mut(b, |bytes| bytes[..200].fill(PATTERN_B)).unwrap();
    p.with_payload_mut(c, |bytes| bytes[..300].fill(PATTERN_C)).unwrap();

    let blocks = p.blocks().unwrap();
    let layout: Vec<_> = blocks.iter().map(|b| (b.offset, b.size, b.is_free)).collect();
    assert_eq!(
        layout,
        vec![
            (0, 112, false),
            (160, 208, false),
            (416, 304, false),
            (768, 208, true),
        ]
    );

    assert!(payload_is(&p, a, 100, PATTERN_A));
    assert!(payload_is(&p, b, 200, PATTERN_B));
    assert!(payload_is(&p, c, 300, PATTERN_C));

    for h in [a, b, c] {
        let ptr = p.get_pointer(h).unwrap().unwrap();
        assert_eq!(ptr.as_ptr() as usize % 16, 0);
    }
    p.check_invariants().unwrap();
}

#[test]
fn freeing_neighbours_coalesces_into_one_gap() {
    let p = pool(1024);
    let _a = p.alloc(100).unwrap();
    let b = p.alloc(200).unwrap();
    let c = p.alloc(300).unwrap();
    let size_b = p.payload_len(b).unwrap();
    let size_c = p.payload_len(c).unwrap();

    p.free(b).unwrap();
    p.free(c).unwrap();

    assert!(p.max_allocatable_size().unwrap() >= size_b + size_c + p.header_size());
    let stats = p.stats().unwrap();
    assert_eq!(stats.free_blocks, 1);
    assert_eq!(stats.live_blocks, 1);
    p.check_invariants().unwrap();
}

#[test]
fn defragment_makes_room_for_large_request() {
    let p = pool(2048);
    let a = p.alloc(400).unwrap();
    let b = p.alloc(400).unwrap();
    let c = p.alloc(400).unwrap();
    p.with_payload_mut(a, |bytes| bytes.fill(PATTERN_A)).unwrap();
    p.with_payload_mut(c, |bytes| bytes.fill(PATTERN_C)).unwrap();
    let c_before = p.get_pointer(c).unwrap().unwrap();

    p.free(b).unwrap();
    let err = p.alloc(800).unwrap_err();
    assert!(matches!(err, PoolError::AllocationFailed { requested: 800, .. }));
    assert_eq!(PoolStatus::from(&err), PoolStatus::AllocationFailed);

    let report = p.defragment().unwrap();
    assert_eq!(report.blocks_moved, 1);
    assert!(report.largest_free_after >= 800);

    // Same handle, same bytes, new address.
    assert!(payload_is(&p, a, 400, PATTERN_A));
    assert!(payload_is(&p, c, 400, PATTERN_C));
    assert_ne!(p.get_pointer(c).unwrap().unwrap(), c_before);

    let d = p.alloc(800).unwrap();
    assert_eq!(d, b, "freed handle value is reused");
    p.check_invariants().unwrap();
}

#[test]
fn zero_and_oversized_requests_are_invalid_size() {
    let p = pool(1024);
    for size in [0, 1024 - 48 + 1, 1024, usize::MAX] {
        let err = p.alloc(size).unwrap_err();
        assert!(
            matches!(err, PoolError::InvalidSize { .. }),
            "size {size}: {err:?}"
        );
        assert_eq!(PoolStatus::from(&err), PoolStatus::InvalidSize);
    }
    assert_eq!(p.handles_in_use().unwrap(), 0);
}

#[test]
fn largest_legal_request_fills_the_pool() {
    let p = pool(1024);
    let h = p.alloc(1024 - 48).unwrap();
    assert_eq!(p.payload_len(h).unwrap(), 976);
    assert_eq!(p.total_free_memory().unwrap(), 0);
    assert_eq!(p.max_allocatable_size().unwrap(), 0);
}

#[test]
fn double_free_then_invalid_handle() {
    let p = pool(1024);
    let h = p.alloc(10).unwrap();
    assert_eq!(PoolStatus::from_result(&p.free(h)), PoolStatus::Success);
    assert_eq!(
        PoolStatus::from_result(&p.free(h)),
        PoolStatus::InvalidHandle
    );
}

#[test]
fn exhausting_handles_reports_table_full_without_side_effects() {
    let p = HandlePool::new(PoolConfig::new(4096).with_max_handles(4)).unwrap();
    let handles: Vec<_> = (0..4).map(|_| p.alloc(16).unwrap()).collect();
    let before = p.blocks().unwrap();

    let err = p.alloc(16).unwrap_err();
    assert_eq!(err, PoolError::HandleTableFull { capacity: 4 });
    assert_eq!(PoolStatus::from(&err), PoolStatus::HandleTableFull);
    assert_eq!(p.blocks().unwrap(), before);

    p.free(handles[2]).unwrap();
    assert_eq!(p.alloc(16).unwrap(), handles[2]);
}

#[test]
fn invalid_configs_map_to_status_codes() {
    let cases = [
        (PoolConfig::new(1024).with_alignment(12), PoolStatus::AlignmentError),
        (PoolConfig::new(1024).with_alignment(32), PoolStatus::AlignmentError),
        (PoolConfig::new(1024).with_max_handles(0), PoolStatus::HandleTableFull),
        (PoolConfig::new(100), PoolStatus::InvalidSize),
    ];
    for (config, status) in cases {
        let err = HandlePool::new(config.clone()).unwrap_err();
        assert_eq!(PoolStatus::from(&err), status, "{config:?}");
    }
}

#[test]
fn small_alignment_packs_tighter() {
    let p = HandlePool::new(PoolConfig::new(512).with_alignment(8)).unwrap();
    assert_eq!(p.header_size(), 40);
    let h = p.alloc(3).unwrap();
    assert_eq!(p.payload_len(h).unwrap(), 8);
    let ptr = p.get_pointer(h).unwrap().unwrap();
    assert_eq!(ptr.as_ptr() as usize % 8, 0);
    p.check_invariants().unwrap();
}
