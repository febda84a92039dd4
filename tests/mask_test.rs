//! Attention mask and position tests.

use gg_sampler::engine::{
    build_positions_from_mask, decode_step_mask, dense_positions, prefill_span_mask,
};
use ndarray::{array, Array2};

fn row(mask: &ndarray::Array3<bool>, b: usize, q: usize) -> Vec<bool> {
    mask.slice(ndarray::s![b, q, ..]).to_vec()
}

// =============================================================================
// Decode Masks
// =============================================================================

#[test]
fn decode_mask_has_one_query_per_row() {
    let valid = Array2::from_elem((3, 5), true);
    let mask = decode_step_mask(2, 8, valid.view());
    assert_eq!(mask.dim(), (3, 1, 8));
}

#[test]
fn decode_mask_window_slides_when_buffer_exceeds_cache() {
    let valid = Array2::from_elem((1, 6), true);
    assert_eq!(row(&decode_step_mask(2, 4, valid.view()), 0, 0), vec![true, true, true, false]);
    assert_eq!(row(&decode_step_mask(5, 4, valid.view()), 0, 0), vec![true; 4]);
}

#[test]
fn decode_mask_window_tracks_padding() {
    let valid = array![[true, true, true, false, true, true]];
    let mask = decode_step_mask(5, 4, valid.view());
    // Window covers slots 2..6; slot 3 is pad.
    assert_eq!(row(&mask, 0, 0), vec![true, false, true, true]);
}

#[test]
fn decode_mask_rows_are_independent() {
    let valid = array![[true, true, true, true], [true, false, false, true]];
    let mask = decode_step_mask(3, 4, valid.view());
    assert_eq!(row(&mask, 0, 0), vec![true; 4]);
    assert_eq!(row(&mask, 1, 0), vec![true, false, false, true]);
}

// =============================================================================
// Prefill Masks
// =============================================================================

#[test]
fn prefill_mask_text_only_is_causal() {
    let valid = Array2::from_elem((1, 4), true);
    let mask = prefill_span_mask(3, 4, valid.view(), None);
    assert_eq!(mask.dim(), (1, 3, 4));
    for q in 0..3 {
        for k in 0..4 {
            assert_eq!(mask[[0, q, k]], k <= q, "q={} k={}", q, k);
        }
    }
}

#[test]
fn prefill_mask_image_blocks_are_bidirectional() {
    let valid = Array2::from_elem((1, 6), true);
    let region = array![[false, true, true, false, true, false]];
    let mask = prefill_span_mask(6, 6, valid.view(), Some(region.view()));

    assert!(mask[[0, 1, 2]], "same block attends forward");
    assert!(mask[[0, 2, 1]]);
    assert!(!mask[[0, 1, 4]], "separate blocks stay causal");
    assert!(mask[[0, 4, 1]]);
    assert!(!mask[[0, 0, 1]], "text slot before a block stays causal");
    assert!(!mask[[0, 4, 5]]);
}

#[test]
fn prefill_mask_never_exceeds_buffer_width() {
    let valid = Array2::from_elem((1, 2), true);
    let mask = prefill_span_mask(2, 5, valid.view(), None);
    assert!((2..5).all(|k| !mask[[0, 1, k]]));
}

// =============================================================================
// Positions
// =============================================================================

#[test]
fn positions_count_valid_slots() {
    let valid = array![[true, true, false, true], [false, true, true, true]];
    let positions = build_positions_from_mask(valid.view());
    assert_eq!(positions, array![[0u32, 1, 1, 2], [0, 0, 1, 2]]);
}

#[test]
fn dense_positions_are_slot_indices() {
    assert_eq!(dense_positions(2, 3), array![[0u32, 1, 2], [0, 1, 2]]);
}
