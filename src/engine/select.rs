//! Next-token selection from a score vector.

use std::fmt::Debug;

use ndarray::{s, Array3, ArrayView1};

/// Picks one vocabulary id from a score vector.
///
/// Bound into the sampler at construction; the decode loop never swaps it.
pub trait TokenSelector: Send + Sync + Debug {
    fn select(&self, scores: ArrayView1<'_, f32>) -> u32;
}

/// Deterministic highest-score selection. The lowest id wins ties and NaN
/// never wins, so identical scores always give identical picks.
#[derive(Debug, Default, Clone, Copy)]
pub struct Greedy;

impl TokenSelector for Greedy {
    fn select(&self, scores: ArrayView1<'_, f32>) -> u32 {
        let mut best = 0usize;
        let mut best_score = f32::NEG_INFINITY;
        for (id, &score) in scores.iter().enumerate() {
            if score > best_score {
                best = id;
                best_score = score;
            }
        }
        best as u32
    }
}

/// Force forbidden ids to -inf at every position. Ids outside the
/// vocabulary are ignored.
pub fn suppress_forbidden(scores: &mut Array3<f32>, forbidden: &[u32]) {
    let vocab = scores.dim().2;
    for &id in forbidden {
        let id = id as usize;
        if id < vocab {
            scores.slice_mut(s![.., .., id]).fill(f32::NEG_INFINITY);
        }
    }
}
