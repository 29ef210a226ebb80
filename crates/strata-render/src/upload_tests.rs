//! Unit tests for user image upload tracking

use super::*;

// ============================================================================
// SUBMISSION
// ============================================================================

#[test]
fn test_transfer_taken_once_across_many_frames() {
    let mut q = UploadQueue::default();
    let id = q.enqueue(3);

    let mut taken = 0;
    for frame in 0..10usize {
        let slot = frame % 2;
        taken += q.take_pending(slot).iter().filter(|&&t| t == id).count();
    }
    assert_eq!(taken, 1);
    assert_eq!(q.state(id), Some(UploadState::Submitted { slot: 0 }));
}

#[test]
fn test_retire_only_matching_slot() {
    let mut q = UploadQueue::default();
    let a = q.enqueue(0);
    assert_eq!(q.take_pending(0), vec![a]);
    let b = q.enqueue(1);
    assert_eq!(q.take_pending(1), vec![b]);

    assert_eq!(q.retire(1), vec![b]);
    assert_eq!(q.state(b), None);
    assert_eq!(q.state(a), Some(UploadState::Submitted { slot: 0 }));

    assert_eq!(q.retire(0), vec![a]);
    assert!(q.is_empty());
}

#[test]
fn test_pending_survives_retire() {
    let mut q = UploadQueue::default();
    let id = q.enqueue(2);
    assert!(q.retire(0).is_empty());
    assert_eq!(q.state(id), Some(UploadState::Pending));
    assert!(q.has_pending());
    assert_eq!(q.pending_for(2).collect::<Vec<_>>(), vec![id]);
    assert_eq!(q.pending_for(1).count(), 0);
}

#[test]
fn test_restore_after_failed_submit() {
    let mut q = UploadQueue::default();
    let id = q.enqueue(0);
    let taken = q.take_pending(1);
    q.restore(&taken);
    assert_eq!(q.state(id), Some(UploadState::Pending));
    assert_eq!(q.take_pending(0), vec![id]);
}

#[test]
fn test_drain_empties_queue() {
    let mut q = UploadQueue::default();
    q.enqueue(0);
    q.enqueue(1);
    q.take_pending(0);
    assert_eq!(q.drain().len(), 2);
    assert_eq!(q.len(), 0);
}

#[test]
fn test_cancel_only_pending() {
    let mut q = UploadQueue::default();
    let a = q.enqueue(2);
    q.take_pending(1);
    let b = q.enqueue(2);
    assert_eq!(q.pending_for(2).collect::<Vec<_>>(), vec![b]);
    assert!(!q.cancel(a));
    assert!(q.cancel(b));
    assert!(!q.cancel(b));
    assert_eq!(q.state(a), Some(UploadState::Submitted { slot: 1 }));
    assert_eq!(q.len(), 1);
}

// ============================================================================
// VALIDATION
// ============================================================================

#[test]
fn test_validate_upload() {
    assert!(validate_upload(0, 4, 4, 64, 16, 4096).is_ok());
    assert_eq!(
        validate_upload(16, 4, 4, 64, 16, 4096),
        Err(UploadError::SlotOutOfRange { slot: 16, max: 16 })
    );
    assert!(matches!(
        validate_upload(0, 0, 4, 0, 16, 4096),
        Err(UploadError::BadExtent { .. })
    ));
    assert_eq!(
        validate_upload(0, 4, 4, 63, 16, 4096),
        Err(UploadError::SizeMismatch {
            width: 4,
            height: 4,
            expected: 64,
            got: 63
        })
    );
}
