//! Unit tests for the per-slot sampled-image table
//!
//! Views are fake handles; only the wiring between slots is checked.

use super::*;
use ash::vk::Handle;

/// `fifo` slots of `layers` views each, numbered `slot * 100 + layer + 1`.
fn views(fifo: usize, layers: usize) -> Vec<Vec<vk::ImageView>> {
    (0..fifo)
        .map(|s| {
            (0..layers)
                .map(|l| vk::ImageView::from_raw((s * 100 + l + 1) as u64))
                .collect()
        })
        .collect()
}

const PLACEHOLDER: u64 = 9999;

// ============================================================================
// FEEDBACK WIRING
// ============================================================================

#[test]
fn test_previous_layers_come_from_slot_written_one_frame_earlier() {
    for fifo in 1..=4 {
        let all = views(fifo, 3);
        // Frame n uses slot n % fifo and must see what frame n-1 wrote.
        for frame in 1..(3 * fifo) {
            let slot = frame % fifo;
            let written_before = (frame - 1) % fifo;
            let table = sampled_table(&all, slot, vk::ImageView::from_raw(PLACEHOLDER), 4);
            assert_eq!(table.current, all[slot], "fifo {fifo} frame {frame}");
            assert_eq!(table.previous, all[written_before], "fifo {fifo} frame {frame}");
        }
    }
}

#[test]
fn test_single_slot_samples_its_own_layers() {
    let all = views(1, 2);
    let table = sampled_table(&all, 0, vk::ImageView::from_raw(PLACEHOLDER), 2);
    assert_eq!(table.previous, table.current);
}

// ============================================================================
// USER IMAGE PLACEHOLDER
// ============================================================================

#[test]
fn test_unloaded_user_images_never_alias_layers() {
    let all = views(2, 4);
    let placeholder = vk::ImageView::from_raw(PLACEHOLDER);
    for slot in 0..2 {
        let table = sampled_table(&all, slot, placeholder, 16);
        assert_eq!(table.user.len(), 16);
        assert!(table.user.iter().all(|&v| v == placeholder));
        for layer_view in all.iter().flatten() {
            assert!(!table.user.contains(layer_view));
        }
    }
}
