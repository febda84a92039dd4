//! The batched decode state machine.
//!
//! `init` (prefill.rs) builds the first state with one forward pass over the
//! prompt; `step` (decode.rs) advances every sequence by one slot; `run`
//! applies `step` until the buffer is full or every sequence is done. All
//! three are pure transitions; tokenization and detokenization stay outside.

use ndarray::{s, Array3, ArrayView2, ArrayView3};
use tracing::debug;

use super::backend::{ForwardOutput, ModelBackend};
use super::codec::SpecialTokens;
use super::error::SamplerError;
use super::select::{suppress_forbidden, TokenSelector};
use super::state::SamplingState;
use super::vision::VisionPreprocessor;

/// Drives prefill and decode for one sampling call.
pub struct SamplingStateMachine<'a, B: ModelBackend> {
    pub(super) backend: &'a B,
    pub(super) params: &'a B::Params,
    pub(super) cache_length: usize,
    pub(super) special: SpecialTokens,
    pub(super) selector: &'a dyn TokenSelector,
    pub(super) vision: Option<&'a dyn VisionPreprocessor>,
}

impl<'a, B: ModelBackend> SamplingStateMachine<'a, B> {
    pub fn new(
        backend: &'a B,
        params: &'a B::Params,
        cache_length: usize,
        special: SpecialTokens,
        selector: &'a dyn TokenSelector,
    ) -> Self {
        Self {
            backend,
            params,
            cache_length,
            special,
            selector,
            vision: None,
        }
    }

    /// Attach the preprocessor used when a call carries images.
    pub fn with_vision(mut self, vision: &'a dyn VisionPreprocessor) -> Self {
        self.vision = Some(vision);
        self
    }

    pub fn cache_length(&self) -> usize {
        self.cache_length
    }

    /// Apply `step` while `should_continue` holds. Never runs past
    /// `total_sampling_steps`.
    pub fn run(
        &self,
        mut state: SamplingState<B::Cache>,
    ) -> Result<SamplingState<B::Cache>, SamplerError> {
        let start = state.decoding_step;
        while state.should_continue() {
            state = self.step(state)?;
        }
        debug!(
            steps = state.decoding_step - start,
            all_done = state.all_done(),
            "decode loop finished"
        );
        Ok(state)
    }

    /// One backend call with shape check and forbidden-id suppression.
    pub(super) fn forward(
        &self,
        tokens: ArrayView2<'_, u32>,
        positions: ArrayView2<'_, u32>,
        cache: B::Cache,
        attention_mask: ArrayView3<'_, bool>,
        multimodal: Option<&Array3<f32>>,
        forbidden: Option<&[u32]>,
    ) -> Result<(Array3<f32>, B::Cache), SamplerError> {
        let (batch, span) = tokens.dim();
        let output = self
            .backend
            .apply(self.params, tokens, positions, cache, attention_mask, multimodal)?;
        output.check_shape(batch, span, self.backend.vocab_size())?;

        let ForwardOutput { mut scores, cache } = output;
        if let Some(ids) = forbidden {
            suppress_forbidden(&mut scores, ids);
        }
        Ok((scores, cache))
    }

    /// Selected token for every row at span offset `t`.
    pub(super) fn candidates(&self, scores: &Array3<f32>, t: usize) -> Vec<u32> {
        (0..scores.dim().0)
            .map(|b| self.selector.select(scores.slice(s![b, t, ..])))
            .collect()
    }
}
