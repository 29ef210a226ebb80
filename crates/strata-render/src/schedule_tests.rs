//! Unit tests for the frame ring state machine

use super::*;

fn run_frame(ring: &mut FrameRing) {
    ring.begin_frame().unwrap();
    ring.fence_signaled().unwrap();
    ring.image_acquired().unwrap();
    ring.submitted().unwrap();
    ring.presented().unwrap();
    ring.advance().unwrap();
}

// ============================================================================
// SLOT SELECTION
// ============================================================================

#[test]
fn test_round_robin_slot_selection() {
    for fifo in 1..=4 {
        let mut ring = FrameRing::new(fifo);
        for n in 0..20u64 {
            assert_eq!(ring.frame_count(), n);
            assert_eq!(ring.current_slot(), (n % fifo as u64) as usize);
            run_frame(&mut ring);
        }
    }
}

#[test]
fn test_every_window_uses_every_slot_once() {
    let fifo = 3;
    let mut ring = FrameRing::new(fifo);
    let mut used = Vec::new();
    for _ in 0..30 {
        used.push(ring.current_slot());
        run_frame(&mut ring);
    }
    for window in used.windows(fifo) {
        let mut w = window.to_vec();
        w.sort_unstable();
        assert_eq!(w, vec![0, 1, 2]);
    }
}

#[test]
fn test_feedback_slot_is_previous_frame() {
    for fifo in 1..=4 {
        let mut ring = FrameRing::new(fifo);
        let mut previous = None;
        for _ in 0..(3 * fifo) {
            let slot = ring.current_slot();
            if let Some(prev) = previous {
                assert_eq!(ring.feedback_slot(slot), prev, "fifo {fifo}");
            }
            assert_eq!(feedback_slot(slot, fifo), ring.feedback_slot(slot));
            previous = Some(slot);
            run_frame(&mut ring);
        }
    }
}

#[test]
fn test_single_slot_feeds_itself() {
    assert_eq!(feedback_slot(0, 1), 0);
    assert_eq!(FrameRing::new(1).feedback_slot(0), 0);
    assert_eq!(feedback_slot(0, 2), 1);
    assert_eq!(feedback_slot(1, 2), 0);
}

// ============================================================================
// WRITE GUARD
// ============================================================================

#[test]
fn test_slots_start_writable() {
    let ring = FrameRing::new(2);
    assert!(ring.ensure_writable(0).is_ok());
    assert!(ring.ensure_writable(1).is_ok());
    assert_eq!(ring.in_flight().count(), 0);
}

#[test]
fn test_submitted_slot_rejects_writes_until_signaled() {
    let mut ring = FrameRing::new(2);
    run_frame(&mut ring);

    // Slot 0 is in flight while frame 1 uses slot 1.
    assert_eq!(
        ring.ensure_writable(0),
        Err(ScheduleError::SlotInFlight { slot: 0 })
    );
    assert!(ring.ensure_writable(1).is_ok());

    run_frame(&mut ring);
    assert_eq!(ring.current_slot(), 0);
    assert_eq!(ring.in_flight().collect::<Vec<_>>(), vec![0, 1]);

    // The wait for slot 0 is what makes it writable again.
    ring.begin_frame().unwrap();
    assert!(ring.ensure_writable(0).is_err());
    ring.fence_signaled().unwrap();
    assert!(ring.ensure_writable(0).is_ok());
    assert!(ring.ensure_writable(1).is_err());
}

// ============================================================================
// PHASES
// ============================================================================

#[test]
fn test_abandon_retries_same_slot() {
    let mut ring = FrameRing::new(2);
    run_frame(&mut ring);

    ring.begin_frame().unwrap();
    ring.fence_signaled().unwrap();
    ring.abandon().unwrap();
    assert_eq!(ring.phase(), FramePhase::Idle);
    assert_eq!(ring.frame_count(), 1);
    assert_eq!(ring.current_slot(), 1);
    assert_eq!(ring.slot_state(1), SlotState::Signaled);
}

#[test]
fn test_out_of_order_transitions_rejected() {
    let mut ring = FrameRing::new(2);
    assert_eq!(
        ring.submitted(),
        Err(ScheduleError::Phase {
            from: FramePhase::Idle,
            to: FramePhase::Submitted
        })
    );
    ring.begin_frame().unwrap();
    assert!(ring.begin_frame().is_err());
    assert!(ring.advance().is_err());
    assert_eq!(ring.phase(), FramePhase::Waiting);
}

// ============================================================================
// HELD IMAGES / UNFENCED QUEUE WORK
// ============================================================================

#[test]
fn test_present_leaves_unfenced_work_until_idle() {
    let mut ring = FrameRing::new(2);
    assert!(!ring.has_unfenced_work());
    run_frame(&mut ring);
    assert!(ring.has_unfenced_work());

    // Waiting every fence is not enough; only a queue idle clears it.
    ring.begin_frame().unwrap();
    ring.fence_signaled().unwrap();
    ring.abandon().unwrap();
    ring.mark_signaled(0);
    assert!(ring.has_unfenced_work());
    ring.queue_idle();
    assert!(!ring.has_unfenced_work());
}

#[test]
fn test_abandon_after_acquire_releases_image() {
    let mut ring = FrameRing::new(2);
    ring.begin_frame().unwrap();
    ring.fence_signaled().unwrap();
    ring.image_acquired().unwrap();
    assert!(ring.holds_image());

    ring.abandon().unwrap();
    assert!(!ring.holds_image());
    assert!(ring.has_unfenced_work());
    assert_eq!(ring.phase(), FramePhase::Idle);
    assert_eq!(ring.current_slot(), 0);
    assert_eq!(ring.slot_state(0), SlotState::Signaled);
}

#[test]
fn test_abandon_without_image_adds_no_unfenced_work() {
    let mut ring = FrameRing::new(2);
    ring.begin_frame().unwrap();
    ring.fence_signaled().unwrap();
    ring.abandon().unwrap();
    assert!(!ring.holds_image());
    assert!(!ring.has_unfenced_work());
}

#[test]
fn test_image_acquired_only_while_acquiring() {
    let mut ring = FrameRing::new(2);
    assert!(ring.image_acquired().is_err());
    ring.begin_frame().unwrap();
    assert!(ring.image_acquired().is_err());
    ring.fence_signaled().unwrap();
    ring.image_acquired().unwrap();
    ring.submitted().unwrap();
    assert!(!ring.holds_image());
    assert!(ring.image_acquired().is_err());
}
