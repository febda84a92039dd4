//! Position indices for the token buffer.

use ndarray::{Array2, ArrayView2};

/// Compute per-slot positions that skip padding.
///
/// A slot's position is the number of valid slots up to and including it,
/// minus one, floored at zero. Pad slots repeat the previous valid position,
/// so a left-padded row still starts counting at zero on its first real token.
pub fn build_positions_from_mask(valid: ArrayView2<'_, bool>) -> Array2<u32> {
    let mut positions = Array2::zeros(valid.raw_dim());
    for (mask_row, mut pos_row) in valid.rows().into_iter().zip(positions.rows_mut()) {
        let mut seen = 0u32;
        for (&is_valid, pos) in mask_row.iter().zip(pos_row.iter_mut()) {
            if is_valid {
                seen += 1;
            }
            *pos = seen.saturating_sub(1);
        }
    }
    positions
}

/// Dense `0..width` positions for every row (multimodal mode).
pub fn dense_positions(batch: usize, width: usize) -> Array2<u32> {
    Array2::from_shape_fn((batch, width), |(_, j)| j as u32)
}
