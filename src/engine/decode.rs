//! Decode: advance every sequence in the batch by one slot.

use ndarray::s;
use tracing::trace;

use super::backend::ModelBackend;
use super::error::SamplerError;
use super::machine::SamplingStateMachine;
use super::mask::decode_step_mask;
use super::state::SamplingState;

impl<'a, B: ModelBackend> SamplingStateMachine<'a, B> {
    /// Single-token forward pass at `decoding_step`, writing slot
    /// `decoding_step + 1`.
    ///
    /// Rows whose prompt still extends past the written slot keep their
    /// prompt token instead of the model's pick.
    pub fn step(
        &self,
        state: SamplingState<B::Cache>,
    ) -> Result<SamplingState<B::Cache>, SamplerError> {
        if state.decoding_step >= state.total_sampling_steps {
            return Err(SamplerError::InputValidation(format!(
                "decode step {} is past the {} step bound",
                state.decoding_step, state.total_sampling_steps
            )));
        }

        let valid = state.input_mask(self.special.pad);
        let SamplingState {
            decoding_step: step,
            num_input_tokens,
            mut token_buffer,
            positions,
            cache,
            mut done,
            total_sampling_steps,
            mut logits_buffer,
            forbidden_token_ids,
        } = state;

        let mask = decode_step_mask(step, self.cache_length, valid.view());
        let (scores, cache) = self.forward(
            token_buffer.slice(s![.., step..step + 1]),
            positions.slice(s![.., step..step + 1]),
            cache,
            mask.view(),
            None,
            forbidden_token_ids.as_deref(),
        )?;

        let next = step + 1;
        let candidates = self.candidates(&scores, 0);
        for (i, candidate) in candidates.into_iter().enumerate() {
            if next >= num_input_tokens[i] {
                token_buffer[[i, next]] = candidate;
            }
            done[i] |= token_buffer[[i, next]] == self.special.eos;
        }

        if let Some(buffer) = logits_buffer.as_mut() {
            buffer
                .slice_mut(s![.., next, ..])
                .assign(&scores.slice(s![.., 0, ..]));
        }

        trace!(step = next, done = ?done, "decode step");

        Ok(SamplingState {
            decoding_step: next,
            num_input_tokens,
            token_buffer,
            positions,
            cache,
            done,
            total_sampling_steps,
            logits_buffer,
            forbidden_token_ids,
        })
    }
}
