//! The model seam: one stateless forward pass.
//!
//! A backend maps tokens, positions, a cache and an attention mask to
//! per-position scores and a fresh cache. The sampler never patches a
//! cache; it hands the old one over by value and keeps what comes back.

use ndarray::{Array3, ArrayView2, ArrayView3};

use super::error::BackendError;

/// Scores and successor cache from one forward pass.
#[derive(Debug, Clone)]
pub struct ForwardOutput<C> {
    /// `[batch, span, vocab]` next-token scores.
    pub scores: Array3<f32>,
    /// Cache after this pass; replaces the input cache wholesale.
    pub cache: C,
}

impl<C> ForwardOutput<C> {
    /// Reject scores that do not line up with the call that produced them.
    pub fn check_shape(&self, batch: usize, span: usize, vocab: usize) -> Result<(), BackendError> {
        let actual = self.scores.shape();
        if actual != [batch, span, vocab].as_slice() {
            return Err(BackendError::ShapeMismatch {
                what: "scores",
                expected: vec![batch, span, vocab],
                actual: actual.to_vec(),
            });
        }
        Ok(())
    }
}

/// Stateless, reentrant forward function of a transformer language model.
///
/// Thread safety of concurrent calls against shared parameters is the
/// implementation's concern.
pub trait ModelBackend: Send + Sync {
    /// Model weights, passed into every call.
    type Params: Send + Sync;
    /// Per-layer key/value state.
    type Cache: Send;

    /// Size of the score vector per position.
    fn vocab_size(&self) -> usize;

    /// Cache capacity the model was configured with, if any.
    fn default_cache_length(&self) -> Option<usize> {
        None
    }

    /// Allocate an empty cache for `batch_size` sequences.
    fn init_cache(
        &self,
        params: &Self::Params,
        batch_size: usize,
        cache_length: usize,
    ) -> Result<Self::Cache, BackendError>;

    /// Run one forward pass.
    ///
    /// `tokens` and `positions` are `[batch, span]`; `attention_mask` is
    /// `[batch, span, cache_length]`. `multimodal` carries image embeddings
    /// to substitute at placeholder tokens during prefill.
    fn apply(
        &self,
        params: &Self::Params,
        tokens: ArrayView2<'_, u32>,
        positions: ArrayView2<'_, u32>,
        cache: Self::Cache,
        attention_mask: ArrayView3<'_, bool>,
        multimodal: Option<&Array3<f32>>,
    ) -> Result<ForwardOutput<Self::Cache>, BackendError>;
}
