//! Unit tests for bump sub-allocation
//!
//! Checks alignment, capacity enforcement, and that regions never overlap.

use super::*;

// ============================================================================
// ALIGNMENT
// ============================================================================

#[test]
fn test_align_up() {
    assert_eq!(align_up(0, 256).unwrap(), 0);
    assert_eq!(align_up(1, 256).unwrap(), 256);
    assert_eq!(align_up(256, 256).unwrap(), 256);
    assert_eq!(align_up(257, 16).unwrap(), 272);
    assert_eq!(align_up(7, 0).unwrap(), 7);
}

#[test]
fn test_align_up_rejects_non_power_of_two() {
    assert_eq!(align_up(10, 12), Err(AllocError::BadAlignment(12)));
}

// ============================================================================
// SUB-ALLOCATION
// ============================================================================

#[test]
fn test_sub_allocate_aligns_and_advances() {
    let mut a = BumpArena::new("host", 1024);
    let r0 = a.sub_allocate(100, 64).unwrap();
    let r1 = a.sub_allocate(10, 64).unwrap();
    assert_eq!(r0, Region { offset: 0, size: 100 });
    assert_eq!(r1, Region { offset: 128, size: 10 });
    assert_eq!(a.used(), 138);
    assert_eq!(a.remaining(), 1024 - 138);
}

#[test]
fn test_exact_fit_then_exhausted() {
    let mut a = BumpArena::new("vertex", 256);
    a.sub_allocate(256, 1).unwrap();
    let err = a.sub_allocate(1, 1).unwrap_err();
    assert_eq!(
        err,
        AllocError::CapacityExceeded {
            block: "vertex",
            requested: 1,
            offset: 256,
            capacity: 256,
        }
    );
    // A failed request leaves the offset untouched.
    assert_eq!(a.used(), 256);
}

#[test]
fn test_padding_counts_against_capacity() {
    let mut a = BumpArena::new("control", 300);
    a.sub_allocate(10, 1).unwrap();
    assert!(a.sub_allocate(100, 256).is_err());
    assert!(a.sub_allocate(100, 16).is_ok());
}

#[test]
fn test_regions_never_overlap() {
    // Deterministic pseudo-random size/alignment sequence.
    let mut state = 0x2545_f491_u64;
    let mut next = || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    let mut a = BumpArena::new("mixed", 1 << 20);
    let mut regions = Vec::new();
    loop {
        let size = next() % 5000 + 1;
        let alignment = 1u64 << (next() % 9);
        match a.sub_allocate(size, alignment) {
            Ok(r) => {
                assert_eq!(r.offset % alignment, 0);
                regions.push(r);
            }
            Err(AllocError::CapacityExceeded { .. }) => break,
            Err(e) => panic!("unexpected {e}"),
        }
    }

    assert!(regions.len() > 10);
    assert!(a.used() <= a.capacity());
    for (i, x) in regions.iter().enumerate() {
        assert!(x.end() <= a.capacity());
        for y in &regions[i + 1..] {
            assert!(!x.overlaps(y), "{x:?} overlaps {y:?}");
        }
    }
}

// ============================================================================
// PACKED SIZE
// ============================================================================

#[test]
fn test_packed_size_matches_arena() {
    let reqs = [
        Requirement { size: 96, alignment: 16 },
        Requirement { size: 16, alignment: 256 },
        Requirement { size: 40, alignment: 64 },
    ];
    let size = packed_size(reqs).unwrap();
    // 0..96, 256..272, 320..360
    assert_eq!(size, 360);

    let mut a = BumpArena::new("exact", size);
    for r in reqs {
        a.allocate(r).unwrap();
    }
    assert_eq!(a.remaining(), 0);
}
