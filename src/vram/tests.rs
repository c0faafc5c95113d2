//! VRAM allocator unit tests
//!
//! Covers the pool invariants: refcount conservation, the capacity
//! invariant, double-free detection, first-fit placement, alignment and
//! gap coalescing.

use super::*;

/// The capacity invariant must hold at every observation point
fn assert_capacity_invariant(pool: &Pool) {
    assert_eq!(
        pool.free_bytes() + pool.used_bytes(),
        pool.capacity(),
        "free + used must equal capacity"
    );
}

#[test]
fn test_new_pool_is_empty() {
    let pool = Pool::new(4096).unwrap();
    assert_eq!(pool.free_bytes(), 4096);
    assert_eq!(pool.used_bytes(), 0);
    assert_eq!(pool.record_count(), 0);
    assert_capacity_invariant(&pool);
}

#[test]
fn test_zero_capacity_rejected() {
    assert!(matches!(Pool::new(0), Err(VramError::InvalidConfig(_))));
}

#[test]
fn test_over_limit_capacity_rejected() {
    assert!(matches!(
        Pool::new(MAX_POOL_CAPACITY + 1),
        Err(VramError::InvalidConfig(_))
    ));
}

#[test]
fn test_first_fit_uses_lowest_address() {
    let mut pool = Pool::new(1024).unwrap();
    let a = pool.allocate(128, 8).unwrap();
    let b = pool.allocate(128, 8).unwrap();
    let _c = pool.allocate(128, 8).unwrap();
    assert_eq!(pool.offset_of(a), Some(0));
    assert_eq!(pool.offset_of(b), Some(128));

    // Free the first record; the next allocation must reuse its gap
    pool.release(a).unwrap();
    pool.release(b).unwrap();
    let d = pool.allocate(64, 8).unwrap();
    assert_eq!(pool.offset_of(d), Some(0));
    assert_capacity_invariant(&pool);
}

#[test]
fn test_alignment_is_honored() {
    let mut pool = Pool::new(1024).unwrap();
    let _a = pool.allocate(10, 8).unwrap();
    let b = pool.allocate(16, 16).unwrap();
    let offset = pool.offset_of(b).unwrap();
    assert_eq!(offset % 16, 0);
    assert_capacity_invariant(&pool);
}

#[test]
fn test_bad_alignment_rejected() {
    let mut pool = Pool::new(1024).unwrap();
    assert!(matches!(
        pool.allocate(16, 3),
        Err(VramError::InvalidConfig(_))
    ));
    assert!(matches!(
        pool.allocate(16, 0),
        Err(VramError::InvalidConfig(_))
    ));
}

#[test]
fn test_out_of_memory_reports_largest_gap() {
    let mut pool = Pool::new(256).unwrap();
    let _a = pool.allocate(200, 8).unwrap();
    match pool.allocate(100, 8) {
        Err(VramError::OutOfMemory {
            requested,
            available,
        }) => {
            assert_eq!(requested, 100);
            assert_eq!(available, 56);
        }
        other => panic!("expected OutOfMemory, got {:?}", other),
    }
    assert_capacity_invariant(&pool);
}

#[test]
fn test_refcount_conservation() {
    let mut pool = Pool::new(4096).unwrap();
    let before = pool.used_bytes();

    let id = pool.allocate(512, 8).unwrap();
    let after_alloc = pool.used_bytes();
    assert_eq!(after_alloc, before + 512);

    // allocate -> clone x4 -> release x5 (any order of the first four)
    for _ in 0..4 {
        assert_eq!(pool.clone_record(id).unwrap(), id);
    }
    assert_eq!(pool.refcount(id), Some(5));

    for _ in 0..4 {
        pool.release(id).unwrap();
        assert_eq!(pool.used_bytes(), after_alloc, "intermediate releases must not free");
        assert_capacity_invariant(&pool);
    }

    pool.release(id).unwrap();
    assert_eq!(pool.used_bytes(), before);
    assert_eq!(pool.refcount(id), None);
    assert_capacity_invariant(&pool);
}

#[test]
fn test_clone_returns_same_identity() {
    let mut pool = Pool::new(1024).unwrap();
    let id = pool.allocate(64, 8).unwrap();
    let clone = pool.clone_record(id).unwrap();
    assert_eq!(clone, id);
    assert_eq!(pool.offset_of(clone), pool.offset_of(id));
}

#[test]
fn test_double_free_detected() {
    let mut pool = Pool::new(1024).unwrap();
    let id = pool.allocate(64, 8).unwrap();
    let neighbor = pool.allocate(64, 8).unwrap();

    pool.release(id).unwrap();
    assert_eq!(pool.release(id), Err(VramError::InvalidHandle(id)));

    // The neighboring record must be untouched
    assert_eq!(pool.refcount(neighbor), Some(1));
    assert_eq!(pool.size_of(neighbor), Some(64));
    assert_capacity_invariant(&pool);
}

#[test]
fn test_release_untracked_id_detected() {
    let mut pool = Pool::new(1024).unwrap();
    let id = pool.allocate(64, 8).unwrap();
    pool.release(id).unwrap();
    assert!(matches!(
        pool.clone_record(id),
        Err(VramError::InvalidHandle(_))
    ));
}

#[test]
fn test_coalescing_rebuilds_full_gap() {
    let mut pool = Pool::new(512).unwrap();
    let a = pool.allocate(128, 8).unwrap();
    let b = pool.allocate(128, 8).unwrap();
    let c = pool.allocate(128, 8).unwrap();

    // Free in an order that exercises both merge directions
    pool.release(b).unwrap();
    pool.release(a).unwrap();
    pool.release(c).unwrap();

    // A full-capacity allocation only succeeds if the gaps merged
    let full = pool.allocate(512, 8).unwrap();
    assert_eq!(pool.offset_of(full), Some(0));
    assert_capacity_invariant(&pool);
}

#[test]
fn test_upload_and_read_back() {
    let mut pool = Pool::new(1024).unwrap();
    let id = pool.allocate(8, 8).unwrap();
    pool.upload(id, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
    assert_eq!(pool.read_back(id).unwrap(), &[1, 2, 3, 4, 5, 6, 7, 8]);

    // Oversized uploads are rejected
    assert!(matches!(
        pool.upload(id, &[0; 16]),
        Err(VramError::InvalidConfig(_))
    ));
}

#[test]
fn test_reset_discards_records() {
    let mut pool = Pool::new(1024).unwrap();
    let id = pool.allocate(64, 8).unwrap();
    pool.reset(2048).unwrap();
    assert_eq!(pool.capacity(), 2048);
    assert_eq!(pool.free_bytes(), 2048);
    assert_eq!(pool.refcount(id), None);
}

#[test]
fn test_bank_selection_capacity() {
    assert_eq!(VramBanks::ABCD.capacity(), 4 * BANK_SIZE);
    assert_eq!(VramBanks::AB.capacity(), 2 * BANK_SIZE);
    assert!(VramBanks::ABCD.contains(VramBanks::C | VramBanks::D));
    assert!(!VramBanks::AB.intersects(VramBanks::C | VramBanks::D));
}
