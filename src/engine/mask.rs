//! Attention masks for the prefill span and for single decode steps.
//!
//! Masks are boolean grids over cache slots; `true` permits attention.
//! Padding slots are never attendable.

use ndarray::{Array3, ArrayView2};

/// Mask for one decode step, shaped `[batch, 1, cache_length]`.
///
/// The query at `step` may attend to every non-pad cache slot at or before
/// `step`. When the buffer is wider than the cache, the validity window
/// slides so that it ends at `step`.
pub fn decode_step_mask(
    step: usize,
    cache_length: usize,
    valid: ArrayView2<'_, bool>,
) -> Array3<bool> {
    let (batch, width) = valid.dim();
    let visible = width.min(cache_length);
    let start = (step + 1).saturating_sub(cache_length).min(width - visible);

    Array3::from_shape_fn((batch, 1, cache_length), |(b, _, k)| {
        let not_pad = k >= visible || valid[[b, start + k]];
        k <= step && not_pad
    })
}

/// Mask for a prefill pass over the first `span` slots, shaped
/// `[batch, span, cache_length]`.
///
/// Causal over valid slots, except that slots inside the same contiguous
/// run of `bidirectional` attend to each other in both directions.
pub fn prefill_span_mask(
    span: usize,
    cache_length: usize,
    valid: ArrayView2<'_, bool>,
    bidirectional: Option<ArrayView2<'_, bool>>,
) -> Array3<bool> {
    let (batch, width) = valid.dim();
    let blocks: Vec<Vec<Option<usize>>> = match bidirectional {
        Some(region) => region.rows().into_iter().map(|row| block_ids(row.iter().copied())).collect(),
        None => vec![vec![None; width]; batch],
    };

    Array3::from_shape_fn((batch, span, cache_length), |(b, q, k)| {
        if k >= width || !valid[[b, k]] {
            return false;
        }
        if k <= q {
            return true;
        }
        match (blocks[b][q], blocks[b][k]) {
            (Some(a), Some(c)) => a == c,
            _ => false,
        }
    })
}

/// Label each slot with the index of the contiguous `true` run it belongs to.
fn block_ids(region: impl Iterator<Item = bool>) -> Vec<Option<usize>> {
    let mut ids = Vec::new();
    let mut next = 0;
    let mut inside = false;
    for flag in region {
        if flag {
            if !inside {
                inside = true;
                next += 1;
            }
            ids.push(Some(next - 1));
        } else {
            inside = false;
            ids.push(None);
        }
    }
    ids
}
